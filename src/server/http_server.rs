use may::coroutine::JoinHandle;
use may_minihttp::HttpService;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;
use tracing::info;

/// Wrapper around may_minihttp's HTTP server
pub struct HttpServer<T>(pub T);

/// Handle to a running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the address with TCP connects. Returns `TimedOut` after roughly 250ms
    /// (50 attempts at 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the accept loop and wait for it to finish
    pub fn stop(self) {
        // SAFETY: cancel is unsafe in may because a cancelled coroutine unwinds at its
        // next yield point. The accept loop owns nothing that needs orderly cleanup and
        // we hold the only handle to it.
        #[allow(unsafe_code)]
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            info!(addr = %self.addr, "Server coroutine ended by cancellation");
        }
    }

    /// Block until the server coroutine completes
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Start the HTTP server on the given address
    ///
    /// Fails if the address does not resolve or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = may_minihttp::HttpServer(self.0).start(addr)?;
        info!(%addr, "Server listening");
        Ok(ServerHandle { addr, handle })
    }
}

/// Block the calling thread until SIGINT or SIGTERM arrives
#[cfg(unix)]
pub fn wait_for_shutdown_signal() -> io::Result<i32> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signal = signals
        .forever()
        .next()
        .ok_or_else(|| io::Error::other("signal iterator closed"))?;
    info!(signal, "Shutdown signal received");
    Ok(signal)
}

/// Without Unix signals there is nothing to wait on; park until the process is killed
#[cfg(not(unix))]
pub fn wait_for_shutdown_signal() -> io::Result<i32> {
    loop {
        thread::park();
    }
}
