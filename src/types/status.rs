use serde::{Deserialize, Serialize};

use crate::types::pyro::PyroStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PyroReadiness(u8);

bitflags::bitflags! {
    /// Reasons why the pyro system is not ready to fire. The flag is
    /// empty when the pyros are both powered and armed.
    impl PyroReadiness: u8 {

        /// **Bit 0** - The pyro supply voltage is too low.
        const SUPPLY_BAD = 1 << 0;

        /// **Bit 1** - The pyro board reports it is not armed.
        const NOT_ARMED  = 1 << 1;
    }
}

impl PyroReadiness {
    pub fn from_status(status: PyroStatus) -> Self {
        let mut readiness = PyroReadiness::empty();
        readiness.set(PyroReadiness::SUPPLY_BAD, !status.supply_good);
        readiness.set(PyroReadiness::NOT_ARMED, !status.armed);
        readiness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_when_powered_and_armed() {
        let status = PyroStatus::new().with_supply_voltage(90).with_armed(true);
        assert!(PyroReadiness::from_status(status).is_empty());
    }

    #[test]
    fn flags_each_missing_condition() {
        let status = PyroStatus::new().with_armed(true);
        assert_eq!(PyroReadiness::from_status(status), PyroReadiness::SUPPLY_BAD);

        let status = PyroStatus::new().with_supply_voltage(90);
        assert_eq!(PyroReadiness::from_status(status), PyroReadiness::NOT_ARMED);

        assert_eq!(PyroReadiness::from_status(PyroStatus::new()), PyroReadiness::all());
    }
}
