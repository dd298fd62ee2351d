use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
	// A second Ctrl+C aborts a run that is still waiting on the server
	if INTERRUPTED.swap(true, Ordering::SeqCst) {
		unsafe { libc::_exit(130) };
	}
}

/// Routes SIGINT to a flag so continuous mode can finish the current run
pub fn install_handler() -> io::Result<()> {
	let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;

	let previous = unsafe { libc::signal(libc::SIGINT, handler) };
	if previous == libc::SIG_ERR {
		return Err(io::Error::last_os_error());
	}
	Ok(())
}

pub fn interrupted() -> bool {
	INTERRUPTED.load(Ordering::SeqCst)
}

/// Sleeps for `duration` unless interrupted first; returns whether it was
pub fn sleep_unless_interrupted(duration: Duration) -> bool {
	let deadline = Instant::now() + duration;

	while !interrupted() {
		let now = Instant::now();
		if now >= deadline {
			return false;
		}
		thread::sleep((deadline - now).min(Duration::from_millis(100)));
	}

	true
}
