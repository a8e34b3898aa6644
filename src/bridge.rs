use anyhow::Error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::io::{pci_read, pci_write, PortIo, SuperIo};
use crate::ports::PortRuns;
use crate::range::{DecodeRange, IsaBytes, LpcWord};
use crate::regs::{
    LpcIoEnables, BRIDGE_ID_REGS, DMA_RESET, F85226_SIGNATURE, FIXED_SETTINGS, INTEL_VENDOR_ID,
    ISA_GENERIC_DECODE, LPC_GENERIC_DECODE, LPC_ID, LPC_IO_DECODE, LPC_VENDOR_MASK,
    PCI_CONFIG_ADDRESS, SIO_UNLOCK,
};

/// Number of decode windows both chips provide.
pub const MAX_WINDOWS: usize = LPC_GENERIC_DECODE.len();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub ranges: Vec<DecodeRange>,
    /// Warn when two windows claim the same port.
    pub check_overlap: bool,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            ranges: DecodeRange::DEFAULTS.to_vec(),
            check_overlap: true,
        }
    }
}

/// Where the program is in its fixed sequence. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    DetectLpc,
    ForwardConfigPort,
    EnableBridgeConfig,
    DetectBridge,
    ProgramWindow(usize),
    ApplyFixedSettings,
    ResetDma,
    Done,
    Failed,
}

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("Can't find Intel LPC controller (got {got:#x}, expected {expected:#x})")]
    LpcControllerNotFound { got: u32, expected: u32 },
    #[error("Can't find Fintek F85226FG LPC-ISA bridge (got {got:#x}, expected {expected:#x})")]
    BridgeNotFound { got: u32, expected: u32 },
    #[error("{count} decode ranges given, the hardware has 1 to 4 windows")]
    WindowCount { count: usize },
    #[error("the program already failed and cannot be resumed")]
    Halted,
    #[error("port I/O failed during {stage:?}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: Error,
    },
}

/// The LPC controller is identified by its vendor ID alone.
pub fn detect_lpc(id: u32) -> Result<(), BridgeError> {
    if id & LPC_VENDOR_MASK == INTEL_VENDOR_ID {
        Ok(())
    } else {
        Err(BridgeError::LpcControllerNotFound { got: id, expected: INTEL_VENDOR_ID })
    }
}

/// The bridge signature must match in all 32 bits.
pub fn detect_bridge(signature: u32) -> Result<(), BridgeError> {
    if signature == F85226_SIGNATURE {
        Ok(())
    } else {
        Err(BridgeError::BridgeNotFound { got: signature, expected: F85226_SIGNATURE })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowReport {
    pub index: usize,
    pub range: DecodeRange,
    pub lpc: LpcWord,
    pub isa: IsaBytes,
    pub ports: PortRuns,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramReport {
    pub lpc_id: u32,
    pub bridge_signature: u32,
    pub windows: Vec<WindowReport>,
}

/// Drives an LPC controller and its ISA bridge through detection and
/// decode-window setup. There are no retries: a failed detection is final.
pub struct BridgeProgram<P: PortIo> {
    io: P,
    ranges: Vec<DecodeRange>,
    stage: Stage,
    report: ProgramReport,
}

impl<P: PortIo> BridgeProgram<P> {
    pub fn new(io: P, cfg: ProgramConfig) -> Result<Self, BridgeError> {
        let count = cfg.ranges.len();
        if count == 0 || count > MAX_WINDOWS {
            return Err(BridgeError::WindowCount { count });
        }
        for r in cfg.ranges.iter().filter(|r| !r.fits_hardware()) {
            warn!("range {r} has bits the decode registers cannot hold; they will be dropped");
        }
        if cfg.check_overlap {
            warn_overlaps(&cfg.ranges);
        }
        Ok(Self {
            io,
            ranges: cfg.ranges,
            stage: Stage::DetectLpc,
            report: ProgramReport::default(),
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn io(&self) -> &P {
        &self.io
    }

    pub fn into_io(self) -> P {
        self.io
    }

    /// What has been detected and programmed so far.
    pub fn report(&self) -> &ProgramReport {
        &self.report
    }

    /// Runs every remaining stage and returns what was programmed.
    pub fn run(&mut self) -> Result<ProgramReport, BridgeError> {
        self.run_with(|_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_stage` with each stage once it
    /// has completed. A program that already failed returns
    /// [`BridgeError::Halted`].
    pub fn run_with<F>(&mut self, mut on_stage: F) -> Result<ProgramReport, BridgeError>
    where
        F: FnMut(Stage, &ProgramReport),
    {
        loop {
            let stage = self.stage;
            match stage {
                Stage::Done => return Ok(self.report.clone()),
                Stage::Failed => return Err(BridgeError::Halted),
                _ => {}
            }
            self.step()?;
            on_stage(stage, &self.report);
        }
    }

    /// Executes the current stage and advances to the next one. On error the
    /// program moves to [`Stage::Failed`] after parking the configuration
    /// address port.
    pub fn step(&mut self) -> Result<Stage, BridgeError> {
        let stage = self.stage;
        let next = match stage {
            Stage::Done | Stage::Failed => return Ok(stage),
            Stage::DetectLpc => self.detect_lpc(),
            Stage::ForwardConfigPort => self.forward_config_port(),
            Stage::EnableBridgeConfig => self.enable_bridge_config(),
            Stage::DetectBridge => self.detect_bridge(),
            Stage::ProgramWindow(i) => self.program_window(i),
            Stage::ApplyFixedSettings => self.apply_fixed_settings(),
            Stage::ResetDma => self.reset_dma(),
        };
        match next {
            Ok(next) => {
                self.stage = next;
                Ok(next)
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    fn fail(&mut self) {
        self.stage = Stage::Failed;
        if let Err(e) = self.io.write_u32(PCI_CONFIG_ADDRESS, 0) {
            warn!("could not park the configuration address port: {e:#}");
        }
    }

    fn detect_lpc(&mut self) -> Result<Stage, BridgeError> {
        let id = pci_read(&mut self.io, LPC_ID).map_err(io_at(Stage::DetectLpc))?;
        detect_lpc(id)?;
        info!("Found Intel LPC Controller ({id:#010x})");
        self.report.lpc_id = id;
        Ok(Stage::ForwardConfigPort)
    }

    fn forward_config_port(&mut self) -> Result<Stage, BridgeError> {
        let stage = Stage::ForwardConfigPort;
        let cur = pci_read(&mut self.io, LPC_IO_DECODE).map_err(io_at(stage))?;
        pci_write(&mut self.io, LPC_IO_DECODE, cur | LpcIoEnables::CNF2.bits()).map_err(io_at(stage))?;
        Ok(Stage::EnableBridgeConfig)
    }

    fn enable_bridge_config(&mut self) -> Result<Stage, BridgeError> {
        let mut sio = SuperIo::new(&mut self.io);
        for _ in 0..2 {
            sio.select(SIO_UNLOCK).map_err(io_at(Stage::EnableBridgeConfig))?;
        }
        Ok(Stage::DetectBridge)
    }

    fn detect_bridge(&mut self) -> Result<Stage, BridgeError> {
        let mut sio = SuperIo::new(&mut self.io);
        let mut signature = 0u32;
        for (index, shift) in BRIDGE_ID_REGS {
            let at = io_at(Stage::DetectBridge);
            match shift {
                Some(shift) => signature |= u32::from(sio.read(index).map_err(at)?) << shift,
                None => sio.select(index).map_err(at)?,
            }
        }
        detect_bridge(signature)?;
        info!("Found Fintek F85226FG LPC-ISA Bridge");
        self.report.bridge_signature = signature;
        Ok(Stage::ProgramWindow(0))
    }

    fn program_window(&mut self, i: usize) -> Result<Stage, BridgeError> {
        let range = self.ranges[i];
        let lpc = range.lpc_word();
        let isa = range.isa_bytes();
        let ports = range.ports();
        info!("Enabling Range {i:x} : {range}, LPC {lpc}");
        info!("Ports : {ports}");

        // the LPC side first, so the bridge only ever sees cycles the
        // controller already forwards
        pci_write(&mut self.io, LPC_GENERIC_DECODE[i], lpc.0)
            .map_err(io_at(Stage::ProgramWindow(i)))?;

        let reg = ISA_GENERIC_DECODE[i];
        let mut sio = SuperIo::new(&mut self.io);
        for (index, val) in [(reg + 1, isa.base_lo), (reg + 2, isa.base_hi), (reg, isa.mask)] {
            sio.write(index, val).map_err(io_at(Stage::ProgramWindow(i)))?;
        }

        self.report.windows.push(WindowReport { index: i, range, lpc, isa, ports });
        Ok(if i + 1 < self.ranges.len() {
            Stage::ProgramWindow(i + 1)
        } else {
            Stage::ApplyFixedSettings
        })
    }

    fn apply_fixed_settings(&mut self) -> Result<Stage, BridgeError> {
        let mut sio = SuperIo::new(&mut self.io);
        for &(index, val) in FIXED_SETTINGS {
            sio.write(index, val).map_err(io_at(Stage::ApplyFixedSettings))?;
        }
        Ok(Stage::ResetDma)
    }

    fn reset_dma(&mut self) -> Result<Stage, BridgeError> {
        for &(port, val) in DMA_RESET {
            self.io.write_u8(port, val).map_err(io_at(Stage::ResetDma))?;
        }
        Ok(Stage::Done)
    }
}

fn io_at(stage: Stage) -> impl Fn(Error) -> BridgeError {
    move |source| BridgeError::Io { stage, source }
}

fn warn_overlaps(ranges: &[DecodeRange]) {
    let runs: Vec<PortRuns> = ranges.iter().map(|r| r.ports()).collect();
    for (i, a) in runs.iter().enumerate() {
        for (j, b) in runs.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                warn!("windows {i} ({}) and {j} ({}) claim the same ports", ranges[i], ranges[j]);
            }
        }
    }
}
