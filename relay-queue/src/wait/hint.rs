//! Busy-wait hint instruction, selected per architecture at build time.

/// Tells the CPU the current thread is in a spin-wait loop.
///
/// On x86/x86_64 this is `pause`, on aarch64/arm `yield`/`isb`, on riscv
/// `pause` (Zihintpause). Elsewhere it degrades to a compiler fence so the
/// polling load isn't hoisted out of the loop.
#[cfg(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "arm",
    target_arch = "riscv32",
    target_arch = "riscv64",
))]
#[inline(always)]
pub fn hardware_idle_hint() {
    core::hint::spin_loop();
}

/// Tells the CPU the current thread is in a spin-wait loop.
#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "arm",
    target_arch = "riscv32",
    target_arch = "riscv64",
)))]
#[inline(always)]
pub fn hardware_idle_hint() {
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

/// Issues `hints` idle hints back to back.
#[inline]
pub(crate) fn spin_burst(hints: u32) {
    for _ in 0..hints {
        hardware_idle_hint();
    }
}
