//! Real port I/O through `in`/`out`.

use anyhow::Result;

use crate::io::PortIo;

/// Direct access to the x86 I/O port space.
pub struct RawPorts {
    _priv: (),
}

impl RawPorts {
    /// # Safety
    /// The caller must already have I/O privilege for every port the program
    /// touches (CPL0, or IOPL 3), and nothing else may be driving the PCI
    /// configuration mechanism or the bridge's index/data ports.
    pub unsafe fn new_unchecked() -> Self {
        Self { _priv: () }
    }

    /// Raises the process I/O privilege level so user space may issue
    /// `in`/`out`. Needs `CAP_SYS_RAWIO`.
    #[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn acquire() -> Result<Self> {
        // SAFETY: iopl only changes this process's privilege level.
        if unsafe { libc::iopl(3) } != 0 {
            let err = std::io::Error::last_os_error();
            anyhow::bail!("iopl(3) failed: {err} (run as root)");
        }
        // SAFETY: IOPL 3 covers the whole port space.
        Ok(unsafe { Self::new_unchecked() })
    }

    #[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
    pub fn acquire() -> Result<Self> {
        anyhow::bail!("direct port I/O is only supported on x86 Linux")
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod arch {
    use core::arch::asm;

    #[inline]
    pub unsafe fn outb(port: u16, val: u8) {
        asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags));
    }

    #[inline]
    pub unsafe fn outl(port: u16, val: u32) {
        asm!("out dx, eax", in("dx") port, in("eax") val, options(nomem, nostack, preserves_flags));
    }

    #[inline]
    pub unsafe fn inb(port: u16) -> u8 {
        let v: u8;
        asm!("in al, dx", in("dx") port, out("al") v, options(nomem, nostack, preserves_flags));
        v
    }

    #[inline]
    pub unsafe fn inl(port: u16) -> u32 {
        let v: u32;
        asm!("in eax, dx", in("dx") port, out("eax") v, options(nomem, nostack, preserves_flags));
        v
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for RawPorts {
    fn read_u8(&mut self, port: u16) -> Result<u8> {
        // SAFETY: privilege was established when `self` was built.
        Ok(unsafe { arch::inb(port) })
    }
    fn read_u32(&mut self, port: u16) -> Result<u32> {
        Ok(unsafe { arch::inl(port) })
    }
    fn write_u8(&mut self, port: u16, val: u8) -> Result<()> {
        unsafe { arch::outb(port, val) };
        Ok(())
    }
    fn write_u32(&mut self, port: u16, val: u32) -> Result<()> {
        unsafe { arch::outl(port, val) };
        Ok(())
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
impl PortIo for RawPorts {
    fn read_u8(&mut self, port: u16) -> Result<u8> {
        anyhow::bail!("no I/O port space on this architecture (in {port:#x})")
    }
    fn read_u32(&mut self, port: u16) -> Result<u32> {
        anyhow::bail!("no I/O port space on this architecture (in {port:#x})")
    }
    fn write_u8(&mut self, port: u16, _val: u8) -> Result<()> {
        anyhow::bail!("no I/O port space on this architecture (out {port:#x})")
    }
    fn write_u32(&mut self, port: u16, _val: u32) -> Result<()> {
        anyhow::bail!("no I/O port space on this architecture (out {port:#x})")
    }
}
