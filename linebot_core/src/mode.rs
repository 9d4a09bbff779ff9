//! Manual/autonomous mode arbitration.
//!
//! A toggle happens on the rising edge of a press: the previous sample was
//! no button and the current one is a toggle-eligible button. Kill never
//! toggles. Save and report presses toggle too unless `exclusive_toggle`
//! is set.

use linebot_traits::{Drive, Indicator};
use tracing::info;

use crate::config::ModeCfg;
use crate::error::Result;
use crate::hw_error::HwContext;
use crate::types::{Button, OperatingMode};

#[derive(Debug, Clone)]
pub struct ModeArbiter {
    mode: OperatingMode,
    previous: Button,
    exclusive_toggle: bool,
}

impl ModeArbiter {
    pub fn new(cfg: &ModeCfg) -> Self {
        Self {
            mode: OperatingMode::Manual,
            previous: Button::None,
            exclusive_toggle: cfg.exclusive_toggle,
        }
    }

    #[inline]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    fn toggles(&self, button: Button) -> bool {
        match button {
            Button::None | Button::Kill => false,
            Button::ModeToggleCandidate(_) => true,
            Button::SaveTelemetry | Button::ReportTelemetry => !self.exclusive_toggle,
        }
    }

    /// Feed one button sample; returns true when the mode flipped.
    pub fn observe(&mut self, button: Button) -> bool {
        let edge = self.previous == Button::None && self.toggles(button);
        self.previous = button;
        if edge {
            self.mode = self.mode.toggled();
        }
        edge
    }

    /// Feed one button sample. On a toggle both motors stop and the
    /// indicator shows the new mode.
    pub fn update(
        &mut self,
        button: Button,
        drive: &mut dyn Drive,
        indicator: &mut dyn Indicator,
    ) -> Result<OperatingMode> {
        if self.observe(button) {
            info!(mode = ?self.mode, ?button, "mode toggled");
            drive.stop_all().hw("stopping motors on mode change")?;
            indicator
                .set(self.mode.indicator_level())
                .hw("setting mode indicator")?;
        }
        Ok(self.mode)
    }
}
