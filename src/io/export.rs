//! CSV export for published schedules.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::Schedule;

/// Column header of the schedule export.
const HEADER: &str = "device_id,device_type,commodity,tick,value";

/// Exports schedules to a CSV file at the given path.
///
/// Writes a header row followed by one row per load-profile entry. A closed
/// profile gets a trailing zero row at its end tick so the file can be
/// replayed as a step function.
///
/// # Arguments
///
/// * `schedules` - Schedules of one optimization run
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(schedules: &[Schedule], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(schedules, buf)
}

/// Writes schedules as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(schedules: &[Schedule], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for s in schedules {
        let id = s.device_id.as_str();
        let end = s.profile.end_time();
        for commodity in s.profile.commodities() {
            let entries = s.profile.entries(commodity);
            for &(tick, value) in entries {
                if end.is_some_and(|e| tick >= e) {
                    continue;
                }
                let (tick, value) = (tick.to_string(), value.to_string());
                wtr.write_record([id, s.device_type, commodity.name(), tick.as_str(), value.as_str()])?;
            }
            if let Some(e) = end {
                let tick = e.to_string();
                wtr.write_record([id, s.device_type, commodity.name(), tick.as_str(), "0"])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceId;
    use crate::profile::{Commodity, LoadProfile};

    fn boiler() -> Schedule {
        let mut profile = LoadProfile::new();
        profile.set_load(Commodity::NaturalGasPower, 0, 16_700);
        profile.set_load(Commodity::NaturalGasPower, 1800, 0);
        profile.set_load(Commodity::HeatingHotWaterPower, 0, -15_000);
        profile.close(3600);
        Schedule {
            device_id: DeviceId::new("gas_boiler"),
            device_type: "GasBoiler",
            profile,
            cervisia: 1.0,
            failed: false,
        }
    }

    fn render(schedules: &[Schedule]) -> String {
        let mut buf = Vec::new();
        write_csv(schedules, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_and_rows() {
        let out = render(&[boiler()]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "device_id,device_type,commodity,tick,value");
        assert!(lines.contains(&"gas_boiler,GasBoiler,NATURALGASPOWER,0,16700"));
        assert!(lines.contains(&"gas_boiler,GasBoiler,NATURALGASPOWER,1800,0"));
        assert!(lines.contains(&"gas_boiler,GasBoiler,HEATINGHOTWATERPOWER,3600,0"));
        // header + 2 gas + gas end + 1 heat + heat end
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn failed_schedule_writes_nothing() {
        let failed = Schedule::empty(DeviceId::new("battery"), "Battery");
        assert_eq!(render(&[failed]).lines().count(), 1);
    }

    #[test]
    fn rows_parse_back() {
        let out = render(&[boiler()]);
        let mut rdr = csv::ReaderBuilder::new().from_reader(out.as_bytes());
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.unwrap();
            assert_eq!(rec.len(), 5);
            assert!(Commodity::from_name(&rec[2]).is_some());
            assert!(rec[3].parse::<i64>().is_ok());
            assert!(rec[4].parse::<i32>().is_ok());
            rows += 1;
        }
        assert_eq!(rows, 5);
    }
}
