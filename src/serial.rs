//! Links to the SoC bus bridge.
//!
//! This module opens the byte stream that carries the register bus protocol.
//! The bridge is usually reached through a serial TTY, but a TCP serial bridge
//! (such as `ser2net`) or the in-process simulated SoC can be used instead.

use crate::bus::Link;
use anyhow::{Context, Result};
use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, SetArg, SpecialCharacterIndices};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::net::TcpStream;

/// Default baud rate of the bridge UART.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Opens a serial TTY in raw mode at a given baud rate.
///
/// Reads on the returned file block until at least one byte is available.
/// Response timeouts are enforced by [`AhbBus`](crate::bus::AhbBus).
#[tracing::instrument(level = "debug")]
pub async fn open_tty(path: &Path, baud: u32) -> Result<fs::File> {
    let rate = baud_rate(baud)?;
    let path_buf = path.to_path_buf();
    let file = match tokio::task::spawn_blocking(move || configure_tty(&path_buf, rate)).await? {
        Ok(file) => file,
        Err(err) => {
            let ports = available_ports().await;
            let hint = if ports.is_empty() {
                "no serial ports found".to_string()
            } else {
                let ports: Vec<String> = ports.iter().map(|p| p.display().to_string()).collect();
                format!("available ports: {}", ports.join(", "))
            };
            return Err(err.context(format!("failed to open {} ({hint})", path.display())));
        }
    };
    tracing::info!("opened {} at {baud} baud", path.display());
    Ok(fs::File::from_std(file))
}

/// Lists the serial ports present on this machine.
///
/// These are the links in `/dev/serial/by-id` followed by the USB serial
/// adapters in `/dev`.
pub async fn available_ports() -> Vec<PathBuf> {
    let mut ports = list_ports(Path::new("/dev/serial/by-id"), &[""]).await;
    ports.extend(list_ports(Path::new("/dev"), &["ttyUSB", "ttyACM"]).await);
    ports
}

// Sorted entries of `dir` whose name starts with one of `prefixes`. A
// directory that cannot be read gives no entries.
async fn list_ports(dir: &Path, prefixes: &[&str]) -> Vec<PathBuf> {
    let mut ports = Vec::new();
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return ports;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let file_name = entry.file_name();
        if file_name
            .to_str()
            .is_some_and(|name| prefixes.iter().any(|prefix| name.starts_with(prefix)))
        {
            ports.push(entry.path());
        }
    }
    ports.sort();
    ports
}

fn configure_tty(path: &Path, rate: BaudRate) -> Result<std::fs::File> {
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(path)?;
    let mut attrs = termios::tcgetattr(&file).context("tcgetattr failed")?;
    termios::cfmakeraw(&mut attrs);
    termios::cfsetspeed(&mut attrs, rate).context("cfsetspeed failed")?;
    attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    termios::tcsetattr(&file, SetArg::TCSANOW, &attrs).context("tcsetattr failed")?;
    // drop whatever the bridge sent before the port was configured
    termios::tcflush(&file, termios::FlushArg::TCIOFLUSH).context("tcflush failed")?;
    Ok(file)
}

/// Converts a baud rate to its termios value.
pub fn baud_rate(baud: u32) -> Result<BaudRate> {
    Ok(match baud {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        460_800 => BaudRate::B460800,
        921_600 => BaudRate::B921600,
        _ => anyhow::bail!("unsupported baud rate {baud}"),
    })
}

/// Connects to a TCP serial bridge.
#[tracing::instrument(level = "debug")]
pub async fn connect_tcp(addr: &str) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    stream.set_nodelay(true)?;
    tracing::info!("connected to {addr}");
    Ok(stream)
}

/// Opens a serial TTY or a TCP bridge as a boxed [`Link`].
pub async fn open(target: &LinkTarget) -> Result<Box<dyn Link>> {
    let link: Box<dyn Link> = match target {
        LinkTarget::Tty { path, baud } => Box::new(open_tty(path, *baud).await?),
        LinkTarget::Tcp(addr) => Box::new(connect_tcp(addr).await?),
    };
    Ok(link)
}

/// Hardware link selection.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum LinkTarget {
    /// Serial TTY.
    Tty {
        /// Device path.
        path: PathBuf,
        /// Baud rate.
        baud: u32,
    },
    /// TCP serial bridge, given as `host:port`.
    Tcp(String),
}

impl std::fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            LinkTarget::Tty { path, baud } => write!(f, "{} @ {baud} baud", path.display()),
            LinkTarget::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn baud_rates() {
        assert_eq!(baud_rate(115_200).unwrap(), BaudRate::B115200);
        assert_eq!(baud_rate(9_600).unwrap(), BaudRate::B9600);
        assert!(baud_rate(12_345).is_err());
    }

    #[test]
    fn display() {
        let tty = LinkTarget::Tty {
            path: "/dev/ttyUSB1".into(),
            baud: DEFAULT_BAUD,
        };
        assert_eq!(tty.to_string(), "/dev/ttyUSB1 @ 115200 baud");
        assert_eq!(
            LinkTarget::Tcp("localhost:2000".into()).to_string(),
            "tcp://localhost:2000"
        );
    }

    #[tokio::test]
    async fn missing_tty() {
        let err = open_tty(Path::new("/nonexistent/tty"), DEFAULT_BAUD)
            .await
            .unwrap_err()
            .to_string();
        assert!(err.starts_with("failed to open /nonexistent/tty ("));
        assert!(err.contains("ports"));
    }

    #[tokio::test]
    async fn port_listing() {
        let dir = std::env::temp_dir().join(format!("rxchain-ports-{}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        for name in ["ttyUSB1", "ttyACM0", "ttyS0", "ttyUSB0", "null"] {
            fs::write(dir.join(name), b"").await.unwrap();
        }
        let ports = list_ports(&dir, &["ttyUSB", "ttyACM"]).await;
        fs::remove_dir_all(&dir).await.unwrap();
        assert_eq!(
            ports,
            [dir.join("ttyACM0"), dir.join("ttyUSB0"), dir.join("ttyUSB1")]
        );
        assert!(list_ports(&dir, &[""]).await.is_empty());
    }

    #[tokio::test]
    async fn tcp_bridge() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"K").await.unwrap();
        });
        let mut link = open(&LinkTarget::Tcp(addr)).await.unwrap();
        let mut ack = [0; 1];
        link.read_exact(&mut ack).await.unwrap();
        assert_eq!(&ack, b"K");
    }
}
