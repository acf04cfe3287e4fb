use chrono::{Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::ports::Clock;

/// Wall clock in a named IANA zone, or the system zone when unknown
pub struct SystemClock {
    zone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: &str) -> Self {
        let zone = match timezone.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                warn!("Timezone error: {}. Using system time.", e);
                None
            }
        };
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.zone {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        }
    }

    fn zone_name(&self) -> String {
        match self.zone {
            Some(tz) => tz.name().to_string(),
            None => "local".to_string(),
        }
    }
}
