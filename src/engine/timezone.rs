//! Timezone gap backfill.
//!
//! Phones without GPS fixes produce local times with no timezone. Most
//! libraries still contain geotagged shots taken around the same moment,
//! so each gap borrows the coordinates of the temporally nearest geotagged
//! row and resolves its timezone from those. Known timezones are never
//! overwritten; rows that cannot be resolved stay as they are.

use anyhow::Result;
use chrono::{Offset, TimeZone};
use chrono_tz::Tz;
use tracing::info;

use crate::capabilities::TimezoneResolver;
use crate::db::{media, Database};

#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillReport {
    pub candidates: usize,
    pub filled: usize,
    pub skipped: usize,
}

pub fn fill_timezone_gaps(
    db: &mut Database,
    resolver: &dyn TimezoneResolver,
) -> Result<BackfillReport> {
    let tx = db.conn.transaction()?;

    let pending = media::media_without_timezone(&tx)?;
    let mut report = BackfillReport {
        candidates: pending.len(),
        ..Default::default()
    };

    for (id, local) in &pending {
        let Some((latitude, longitude)) = media::nearest_coordinates(&tx, *local)? else {
            report.skipped += 1;
            continue;
        };
        let Some(tz) = resolver
            .timezone_at(latitude, longitude)
            .and_then(|name| name.parse::<Tz>().ok().map(|tz| (name, tz)))
        else {
            report.skipped += 1;
            continue;
        };
        let (name, tz) = tz;

        let mapped = tz.from_local_datetime(local);
        let Some(localized) = mapped.single().or_else(|| mapped.earliest()) else {
            report.skipped += 1;
            continue;
        };

        let offset = localized.offset().fix().local_minus_utc();
        media::update_timezone(&tx, id, &name, offset, localized.naive_utc())?;
        report.filled += 1;
    }

    tx.commit()?;

    if report.candidates > 0 {
        info!(
            "Timezone backfill: {} filled, {} skipped of {} candidates",
            report.filled, report.skipped, report.candidates
        );
    }
    Ok(report)
}
