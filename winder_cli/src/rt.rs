//! Real-time scheduling for the step loop (Linux: mlockall, SCHED_FIFO, CPU affinity).
//!
//! Every step here is best effort. A failure is logged and the run carries
//! on with normal scheduling; only jitter suffers.

use crate::cli::RtLock;

#[derive(Copy, Clone, Debug)]
pub struct RtOpts {
    pub prio: Option<i32>,
    pub lock: RtLock,
    pub cpu: Option<usize>,
}

#[cfg(target_os = "linux")]
pub fn setup_rt_once(opts: RtOpts) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match lock_memory(opts.lock) {
            Ok(()) => tracing::info!(lock = ?opts.lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(error = %e, "rt: mlockall failed"),
        }
        match fifo_priority(opts.prio) {
            Ok(p) => tracing::info!(prio = p, "rt: SCHED_FIFO enabled"),
            Err(e) => tracing::warn!(error = %e, "rt: SCHED_FIFO not applied"),
        }
        let cpu = opts.cpu.unwrap_or(0);
        match pin_to_cpu(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: pinned"),
            Err(e) => tracing::warn!(error = %e, cpu, "rt: affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(opts: RtOpts) {
    tracing::warn!(?opts, "real-time mode is only supported on Linux; ignoring --rt");
}

#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall only takes flags and touches no Rust-managed memory.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);

    // Future pages are the usual casualty of a small memlock ulimit.
    if retryable && lock == RtLock::All && unsafe { mlockall(MCL_CURRENT) } == 0 {
        tracing::warn!(error = %err, "rt: mlockall(current|future) failed, locked current pages only");
        return Ok(());
    }

    let mut msg = format!("mlockall: {err}");
    if retryable {
        if let Some(limit) = memlock_limit_kib() {
            msg.push_str(&format!("; memlock limit {limit} KiB"));
        }
        msg.push_str("; needs CAP_IPC_LOCK or a larger 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn memlock_limit_kib() -> Option<u64> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success, which is checked before reading.
    unsafe {
        if libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) != 0 {
            return None;
        }
        let r = rlim.assume_init();
        (r.rlim_cur != libc::RLIM_INFINITY).then_some(r.rlim_cur / 1024)
    }
}

/// Switch the process to SCHED_FIFO, clamping the priority to the system range.
#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    if !has_cap_sys_nice() && unsafe { libc::geteuid() } != 0 {
        eyre::bail!(
            "needs CAP_SYS_NICE or root; try 'sudo setcap cap_sys_nice=ep /path/to/winder'"
        );
    }
    // SAFETY: plain queries without pointers.
    let (min, max) = unsafe { (sched_get_priority_min(SCHED_FIFO), sched_get_priority_max(SCHED_FIFO)) };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let p = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param { sched_priority: p };
    // SAFETY: param lives for the duration of the call.
    if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(p)
}

#[cfg(target_os = "linux")]
fn has_cap_sys_nice() -> bool {
    const CAP_SYS_NICE: u64 = 1 << 23;
    std::fs::read_to_string("/proc/self/status").is_ok_and(|status| {
        status
            .lines()
            .filter(|l| l.starts_with("CapEff:"))
            .filter_map(|l| l.split_whitespace().nth(1))
            .filter_map(|hex| u64::from_str_radix(hex, 16).ok())
            .any(|caps| caps & CAP_SYS_NICE != 0)
    })
}

#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

    let capacity = std::mem::size_of::<cpu_set_t>() * 8;
    if cpu >= capacity {
        eyre::bail!("CPU {cpu} exceeds cpu_set_t capacity {capacity}");
    }
    // SAFETY: cpu_set_t is plain data; every pointer passed below refers to a local.
    unsafe {
        let mut allowed: cpu_set_t = std::mem::zeroed();
        if libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
        if !CPU_ISSET(cpu, &allowed) {
            eyre::bail!("CPU {cpu} not permitted by current affinity mask");
        }
        let mut desired: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut desired);
        CPU_SET(cpu, &mut desired);
        if libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &desired) != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}
