use std::net::TcpStream;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use caseboard::model::TestCase;

pub struct ServerGuard {
    pub base_url: String,
    pub data_dir: tempfile::TempDir,
    child: Child,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl ServerGuard {
    /// Kill the server and start a fresh one on the same data dir. Used to
    /// check that mutations survive a restart.
    #[allow(dead_code)]
    pub fn restart(&mut self) -> Result<()> {
        let _ = self.child.kill();
        let _ = self.child.wait();

        let (base_url, child) = spawn_child(self.data_dir.path(), None)?;
        self.base_url = base_url;
        self.child = child;
        Ok(())
    }
}

#[allow(dead_code)]
pub fn spawn_server() -> Result<ServerGuard> {
    spawn(None)
}

/// Spawn a server whose store starts out holding `cases`.
#[allow(dead_code)]
pub fn spawn_server_seeded(cases: &[TestCase]) -> Result<ServerGuard> {
    spawn(Some(cases))
}

fn spawn(seed: Option<&[TestCase]>) -> Result<ServerGuard> {
    let data_dir = tempfile::tempdir().context("create server tempdir")?;

    let seed_file = match seed {
        Some(cases) => {
            let path = data_dir.path().join("seed.json");
            let bytes = serde_json::to_vec_pretty(cases).context("serialize seed")?;
            std::fs::write(&path, bytes).context("write seed file")?;
            Some(path)
        }
        None => None,
    };

    let (base_url, child) = spawn_child(data_dir.path(), seed_file.as_deref())?;

    Ok(ServerGuard {
        base_url,
        data_dir,
        child,
    })
}

fn spawn_child(data_dir: &Path, seed_file: Option<&Path>) -> Result<(String, Child)> {
    let addr_file = data_dir.join("addr.txt");
    let _ = std::fs::remove_file(&addr_file);

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_caseboard-server"));
    cmd.args([
        "--addr",
        "127.0.0.1:0",
        "--addr-file",
        addr_file.to_str().unwrap(),
        "--data-dir",
        data_dir.to_str().unwrap(),
    ]);
    if let Some(seed) = seed_file {
        cmd.args(["--seed", seed.to_str().unwrap()]);
    }

    let child = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn caseboard-server")?;

    let addr = read_addr_file(&addr_file)?;
    wait_for_listener(&addr)?;

    Ok((format!("http://{}", addr), child))
}

fn read_addr_file(addr_file: &Path) -> Result<String> {
    let start = Instant::now();
    loop {
        if start.elapsed() > Duration::from_secs(5) {
            anyhow::bail!("addr file not written at {}", addr_file.display());
        }

        if let Ok(s) = std::fs::read_to_string(addr_file) {
            let s = s.trim();
            if !s.is_empty() {
                return Ok(s.to_string());
            }
        }
        thread::sleep(Duration::from_millis(10));
    }
}

// Plain TCP probe so this works from sync and async tests alike.
fn wait_for_listener(addr: &str) -> Result<()> {
    let start = Instant::now();
    loop {
        if start.elapsed() > Duration::from_secs(5) {
            anyhow::bail!("server did not start listening on {}", addr);
        }
        if TcpStream::connect(addr).is_ok() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(25));
    }
}
