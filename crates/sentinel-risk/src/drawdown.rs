//! Drawdown circuit breaker
//!
//! Tracks the equity high-water mark and halts trading once the
//! peak-to-trough decline exceeds the configured fraction. The halt is a
//! latch: recovering equity does not lift it, only [`DrawdownMonitor::reset`].

use rust_decimal::Decimal;
use sentinel_core::{RiskCondition, RiskParameters};
use tracing::{debug, warn};

/// Running peak / drawdown tracker with a sticky halt flag
#[derive(Debug, Clone)]
pub struct DrawdownMonitor {
    max_drawdown_fraction: Decimal,
    /// High-water mark; `None` until the first equity sample
    peak: Option<Decimal>,
    current: Decimal,
    halted: bool,
}

impl DrawdownMonitor {
    pub fn new(max_drawdown_fraction: Decimal) -> Self {
        Self {
            max_drawdown_fraction,
            peak: None,
            current: Decimal::ZERO,
            halted: false,
        }
    }

    pub fn from_params(params: &RiskParameters) -> Self {
        Self::new(params.max_drawdown_fraction)
    }

    /// Feed the latest equity and return whether trading is halted
    pub fn update(&mut self, current_equity: Decimal) -> bool {
        let peak = match self.peak {
            Some(peak) if peak >= current_equity => peak,
            _ => {
                if self.peak.is_some() {
                    debug!(new_peak = %current_equity, "New high-water mark");
                }
                current_equity
            }
        };
        self.peak = Some(peak);
        self.current = current_equity;

        let drawdown = self.current_drawdown();
        if !self.halted && drawdown > self.max_drawdown_fraction {
            self.halted = true;
            warn!(
                condition = %RiskCondition::RiskBreach,
                peak = %peak,
                equity = %current_equity,
                drawdown = %drawdown,
                limit = %self.max_drawdown_fraction,
                "Drawdown limit breached, trading halted"
            );
        }

        self.halted
    }

    /// (peak - current) / peak, zero before the first sample or for a zero peak
    pub fn current_drawdown(&self) -> Decimal {
        match self.peak {
            Some(peak) if !peak.is_zero() => (peak - self.current) / peak,
            _ => Decimal::ZERO,
        }
    }

    pub fn peak(&self) -> Option<Decimal> {
        self.peak
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn max_drawdown_fraction(&self) -> Decimal {
        self.max_drawdown_fraction
    }

    /// Forget the peak and lift the halt, for a fresh run
    pub fn reset(&mut self) {
        self.peak = None;
        self.current = Decimal::ZERO;
        self.halted = false;
    }

    /// Get a status summary for logging
    pub fn status(&self) -> DrawdownStatus {
        DrawdownStatus {
            current_value: self.current,
            peak_value: self.peak.unwrap_or(Decimal::ZERO),
            drawdown: self.current_drawdown(),
            halted: self.halted,
        }
    }
}

/// Status summary for drawdown state
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownStatus {
    pub current_value: Decimal,
    pub peak_value: Decimal,
    /// Fraction, e.g. 0.15 for 15%
    pub drawdown: Decimal,
    pub halted: bool,
}

impl std::fmt::Display for DrawdownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Drawdown: {:.2}% (${:.2} from peak ${:.2}){}",
            self.drawdown * Decimal::ONE_HUNDRED,
            self.current_value,
            self.peak_value,
            if self.halted { " [HALTED]" } else { "" }
        )
    }
}
