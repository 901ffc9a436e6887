//! Connection table of the current process, read from `/proc` on Linux.
//!
//! `/proc/net/tcp{,6}` lists every socket in the network namespace; rows are narrowed to
//! this process by matching their inode against the `socket:[inode]` links in
//! `/proc/self/fd`.

use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

use super::{Connection, ConnectionSource};
use crate::error::VerifyError;

const TCP_LISTEN: u8 = 0x0A;

/// `/proc`-backed [`ConnectionSource`].
#[derive(Debug, Clone)]
pub struct ProcNetTcp {
    proc_root: PathBuf,
}

impl Default for ProcNetTcp {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl ProcNetTcp {
    pub fn new() -> Self {
        Self::default()
    }

    fn own_socket_inodes(&self) -> Result<HashSet<u64>, VerifyError> {
        let fd_dir = self.proc_root.join("self/fd");
        let entries = fs::read_dir(&fd_dir).map_err(|e| {
            VerifyError::ResourceUnavailable(format!("cannot list {}: {}", fd_dir.display(), e))
        })?;
        let mut inodes = HashSet::new();
        for entry in entries.flatten() {
            // fds can close between read_dir and read_link; skip those.
            if let Ok(target) = fs::read_link(entry.path()) {
                if let Some(inode) = socket_inode(&target.to_string_lossy()) {
                    inodes.insert(inode);
                }
            }
        }
        Ok(inodes)
    }
}

impl ConnectionSource for ProcNetTcp {
    #[cfg(target_os = "linux")]
    fn snapshot(&self) -> Result<Vec<Connection>, VerifyError> {
        let inodes = self.own_socket_inodes()?;
        let mut out = Vec::new();
        for table in ["net/tcp", "net/tcp6"] {
            let path = self.proc_root.join(table);
            match fs::read_to_string(&path) {
                Ok(text) => out.extend(parse_table(&text, &inodes)),
                // tcp6 is absent on kernels built without IPv6.
                Err(e) if table == "net/tcp6" && e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(VerifyError::ResourceUnavailable(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Ok(out)
    }

    #[cfg(not(target_os = "linux"))]
    fn snapshot(&self) -> Result<Vec<Connection>, VerifyError> {
        Err(VerifyError::ResourceUnavailable(
            "connection table is only readable on Linux".to_string(),
        ))
    }
}

/// `socket:[12345]` -> 12345.
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

/// Rows of one `/proc/net/tcp*` file owned by `inodes`, skipping listeners and sockets
/// without a peer.
fn parse_table(text: &str, inodes: &HashSet<u64>) -> Vec<Connection> {
    let mut out = Vec::new();
    for line in text.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let inode = match fields[9].parse::<u64>() {
            Ok(i) => i,
            Err(_) => continue,
        };
        if !inodes.contains(&inode) {
            continue;
        }
        if u8::from_str_radix(fields[3], 16).unwrap_or(0) == TCP_LISTEN {
            continue;
        }
        let (local, remote) = match (parse_proc_address(fields[1]), parse_proc_address(fields[2])) {
            (Some(l), Some(r)) => (l, r),
            _ => continue,
        };
        if remote.0.is_unspecified() {
            continue;
        }
        out.push(Connection {
            local_port: local.1,
            remote_ip: remote.0,
        });
    }
    out
}

/// `0100007F:1F90` -> (127.0.0.1, 8080). Each 32-bit word is printed in host (little-endian)
/// byte order; IPv4-mapped IPv6 addresses are folded back to IPv4.
fn parse_proc_address(field: &str) -> Option<(IpAddr, u16)> {
    let (ip_hex, port_hex) = field.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let ip = match ip_hex.len() {
        8 => IpAddr::V4(Ipv4Addr::from(u32::from_str_radix(ip_hex, 16).ok()?.to_le_bytes())),
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_mut(4).enumerate() {
                let word = u32::from_str_radix(&ip_hex[i * 8..i * 8 + 8], 16).ok()?;
                chunk.copy_from_slice(&word.to_le_bytes());
            }
            let v6 = Ipv6Addr::from(octets);
            match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(v6),
            }
        }
        _ => return None,
    };
    Some((ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 111 1 0000000000000000 100 0 0 10 0
   1: 0100A8C0:D431 22D8B85D:0050 01 00000000:00000000 00:00000000 00000000  1000        0 222 1 0000000000000000 20 4 30 10 -1
   2: 0100A8C0:D432 04030201:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 333 1 0000000000000000 20 4 30 10 -1
";

    const TCP6: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0000000000000000FFFF00000100A8C0:D433 0000000000000000FFFF000008070605:0050 01 00000000:00000000 00:00000000 00000000  1000        0 444 1 0000000000000000 20 4 30 10 -1
   1: 00000000000000000000000001000000:D434 00000000000000000000000001000000:1F90 01 00000000:00000000 00:00000000 00000000  1000        0 555 1 0000000000000000 20 4 30 10 -1
";

    #[test]
    fn socket_inode_from_link() {
        assert_eq!(socket_inode("socket:[98765]"), Some(98765));
        assert_eq!(socket_inode("pipe:[98765]"), None);
        assert_eq!(socket_inode("/dev/null"), None);
    }

    #[test]
    fn parse_ipv4_address() {
        assert_eq!(
            parse_proc_address("0100007F:1F90"),
            Some((IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080))
        );
        assert_eq!(parse_proc_address("bogus"), None);
    }

    #[test]
    fn table_filters_by_inode_and_skips_listeners() {
        let inodes: HashSet<u64> = [111, 222].into_iter().collect();
        let conns = parse_table(TCP, &inodes);
        assert_eq!(
            conns,
            vec![Connection {
                local_port: 0xD431,
                remote_ip: IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)),
            }]
        );
    }

    #[test]
    fn table_keeps_row_order() {
        let inodes: HashSet<u64> = [222, 333].into_iter().collect();
        let ports: Vec<u16> = parse_table(TCP, &inodes).iter().map(|c| c.local_port).collect();
        assert_eq!(ports, [0xD431, 0xD432]);
    }

    #[test]
    fn tcp6_mapped_and_loopback() {
        let inodes: HashSet<u64> = [444, 555].into_iter().collect();
        let conns = parse_table(TCP6, &inodes);
        assert_eq!(conns.len(), 2);
        assert_eq!(conns[0].remote_ip, IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8)));
        assert_eq!(conns[1].remote_ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(conns[1].local_port, 0xD434);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn snapshot_sees_own_outbound_connection() {
        use std::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let local_port = stream.local_addr().unwrap().port();

        let conns = ProcNetTcp::new().snapshot().unwrap();
        assert!(conns.iter().any(|c| c.local_port == local_port
            && c.remote_ip == IpAddr::V4(Ipv4Addr::LOCALHOST)));
        // The listening socket itself is never reported.
        let listen_port = listener.local_addr().unwrap().port();
        assert!(!conns
            .iter()
            .any(|c| c.local_port == listen_port && c.remote_ip.is_unspecified()));
    }
}
