//! Byte I/O helpers.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Writes the entire byte sequence, retrying past partial writes and interrupts.
pub async fn send_all<W: AsyncWriteExt + Unpin>(sock: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    sock.write_all(bytes).await
}

/// Single read into `buf`. `0` means the peer closed the connection.
pub async fn recv_once<R: AsyncReadExt + Unpin>(sock: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    sock.read(buf).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accepted, client) = tokio::join!(listener.accept(), connect);
        (accepted.unwrap().0, client.unwrap())
    }

    #[tokio::test]
    async fn send_all_delivers_every_byte() {
        let (mut server, mut client) = loopback_pair().await;
        let payload = vec![7u8; 64 * 1024];
        let payload_clone = payload.clone();

        let writer = tokio::spawn(async move {
            send_all(&mut client, &payload_clone).await.unwrap();
        });

        let mut received = vec![0u8; payload.len()];
        let mut read_total = 0;
        while read_total < received.len() {
            let n = recv_once(&mut server, &mut received[read_total..]).await.unwrap();
            assert!(n > 0);
            read_total += n;
        }
        writer.await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn recv_once_returns_zero_on_orderly_close() {
        let (server, client) = loopback_pair().await;
        drop(client);
        let mut server = server;
        let mut buf = [0u8; 16];
        assert_eq!(recv_once(&mut server, &mut buf).await.unwrap(), 0);
    }
}
