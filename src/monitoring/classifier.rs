use crate::db::enums::MonitorTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub notify: bool,
    /// A persistent alarm that was already notified has cleared this cycle.
    pub alarm_ended: bool,
}

/// Decides whether a device must notify.
///
/// One-shot devices notify whenever the trigger condition holds. Persistent
/// devices notify once when the condition starts and once when it clears,
/// and stay quiet while it holds steady.
pub fn classify(
    reachable: bool,
    trigger: MonitorTrigger,
    persist: bool,
    been_notified: bool,
) -> Classification {
    let criteria_met = match trigger {
        MonitorTrigger::Online => reachable,
        MonitorTrigger::Offline => !reachable,
    };

    if !persist {
        return Classification {
            notify: criteria_met,
            alarm_ended: false,
        };
    }

    let rising = !been_notified && criteria_met;
    let falling = been_notified && !criteria_met;
    Classification {
        notify: rising || falling,
        alarm_ended: falling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MonitorTrigger::{Offline, Online};

    #[test]
    fn test_one_shot_offline() {
        assert_eq!(
            classify(false, Offline, false, false),
            Classification {
                notify: true,
                alarm_ended: false
            }
        );
        assert!(!classify(true, Offline, false, false).notify);
    }

    #[test]
    fn test_one_shot_online() {
        assert!(classify(true, Online, false, false).notify);
        assert!(!classify(false, Online, false, false).notify);
    }

    #[test]
    fn test_one_shot_ignores_been_notified() {
        assert_eq!(
            classify(false, Offline, false, true),
            Classification {
                notify: true,
                alarm_ended: false
            }
        );
    }

    #[test]
    fn test_persistent_rising_edge() {
        assert_eq!(
            classify(false, Offline, true, false),
            Classification {
                notify: true,
                alarm_ended: false
            }
        );
    }

    #[test]
    fn test_persistent_steady_alarm_does_not_repeat() {
        assert!(!classify(false, Offline, true, true).notify);
    }

    #[test]
    fn test_persistent_falling_edge() {
        assert_eq!(
            classify(true, Offline, true, true),
            Classification {
                notify: true,
                alarm_ended: true
            }
        );
    }

    #[test]
    fn test_persistent_never_alarmed() {
        assert_eq!(
            classify(true, Offline, true, false),
            Classification {
                notify: false,
                alarm_ended: false
            }
        );
    }

    #[test]
    fn test_persistent_online_trigger() {
        assert_eq!(
            classify(true, Online, true, false),
            Classification {
                notify: true,
                alarm_ended: false
            }
        );
        assert_eq!(
            classify(false, Online, true, true),
            Classification {
                notify: true,
                alarm_ended: true
            }
        );
        assert!(!classify(true, Online, true, true).notify);
    }
}
