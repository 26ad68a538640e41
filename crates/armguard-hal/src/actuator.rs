//! Joint actuation and emergency brake traits.
//!
//! Drivers implement these traits; the rest of the stack only ever talks to
//! the trait, so a simulated arm and a real controller are interchangeable.

use armguard_types::{ArmError, JointConfiguration};

/// Position-controlled six-joint arm.
pub trait JointActuator: Send {
    /// Stable identifier, e.g. `"arm_controller"`.
    fn id(&self) -> &str;

    /// Command the arm towards `target` (radians).
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::HardwareFault`] if the command cannot be applied.
    fn command(&mut self, target: &JointConfiguration) -> Result<(), ArmError>;

    /// Hold the current position.  Issued every cycle while the interlock is
    /// engaged.
    fn hold(&mut self) -> Result<(), ArmError>;
}

/// Hardware stop line.  Engaging it must remove actuator power regardless of
/// any pending command.
pub trait EmergencyBrake: Send {
    fn id(&self) -> &str;

    /// # Errors
    ///
    /// [`ArmError::HardwareFault`] if the stop could not be confirmed.
    fn engage(&mut self) -> Result<(), ArmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process actuator used only for tests.
    struct MockArm {
        last: Option<JointConfiguration>,
        holds: usize,
    }

    impl JointActuator for MockArm {
        fn id(&self) -> &str {
            "mock_arm"
        }

        fn command(&mut self, target: &JointConfiguration) -> Result<(), ArmError> {
            self.last = Some(*target);
            Ok(())
        }

        fn hold(&mut self) -> Result<(), ArmError> {
            self.holds += 1;
            Ok(())
        }
    }

    #[test]
    fn mock_arm_records_command_and_hold() {
        let mut arm = MockArm { last: None, holds: 0 };
        let target = JointConfiguration([0.1, 0.2, 0.3, 0.0, 0.0, 0.0]);
        arm.command(&target).unwrap();
        arm.hold().unwrap();
        assert_eq!(arm.id(), "mock_arm");
        assert_eq!(arm.last, Some(target));
        assert_eq!(arm.holds, 1);
    }
}
