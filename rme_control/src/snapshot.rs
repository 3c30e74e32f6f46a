//! The structured `/dump/save` document: device metadata plus the mirror's
//! current values bucketed into the persisted-state schema, and the
//! timestamped device-config filename scheme.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rme_core::{ErrorKind, Result, RmeError};
use rme_mirror::DeviceMirror;
use rosc::OscType;

pub const SAMPLE_RATE_PATH: &str = "/samplerate";
pub const CLOCK_SOURCE_PATH: &str = "/clock/source";
pub const BUFFER_SIZE_PATH: &str = "/buffersize";

/// Device identity recorded in a persisted-state document's `device` block.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub id: String,
    pub version: String,
    pub flags: Vec<String>,
}

/// Builds the persisted-state JSON document described in the wire
/// interface: `device`, `inputs[]`, `outputs[]`, `mixer[]`, `system`.
/// Mirror paths are bucketed by the `/input/<n>/<field>`,
/// `/output/<n>/<field>`, and `/mix/<out>/input/<in>/<field>` naming
/// conventions; anything else is left out of the structured arrays (the
/// flat log dump via `DeviceMirror::dump_text` is the uncurated view).
pub fn persisted_state(device: &DeviceInfo, mirror: &DeviceMirror, timestamp_unix_secs: u64) -> serde_json::Value {
    let mut inputs: BTreeMap<u32, serde_json::Map<String, serde_json::Value>> = BTreeMap::new();
    let mut outputs: BTreeMap<u32, serde_json::Map<String, serde_json::Value>> = BTreeMap::new();
    let mut mixer: BTreeMap<u32, BTreeMap<u32, serde_json::Map<String, serde_json::Value>>> = BTreeMap::new();
    let mut system = serde_json::Map::new();

    for (path, args) in mirror.snapshot() {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [kind, index, field] if *kind == "input" => {
                if let Ok(n) = index.parse::<u32>() {
                    inputs.entry(n).or_default().insert((*field).to_string(), args_to_json(args));
                }
            }
            [kind, index, field] if *kind == "output" => {
                if let Ok(n) = index.parse::<u32>() {
                    outputs.entry(n).or_default().insert((*field).to_string(), args_to_json(args));
                }
            }
            ["mix", out_index, "input", in_index] => {
                if let (Ok(o), Ok(i)) = (out_index.parse::<u32>(), in_index.parse::<u32>()) {
                    let source = mixer.entry(o).or_default().entry(i).or_default();
                    if let [OscType::Float(vol), OscType::Float(pan), OscType::Float(width)] = args.as_slice() {
                        source.insert("volume".to_string(), serde_json::Value::from(*vol));
                        source.insert("pan".to_string(), serde_json::Value::from(*pan));
                        source.insert("width".to_string(), serde_json::Value::from(*width));
                    }
                }
            }
            _ if path == SAMPLE_RATE_PATH => {
                system.insert("sample_rate".to_string(), args_to_json(args));
            }
            _ if path == CLOCK_SOURCE_PATH => {
                system.insert("clock_source".to_string(), args_to_json(args));
            }
            _ if path == BUFFER_SIZE_PATH => {
                system.insert("buffer_size".to_string(), args_to_json(args));
            }
            _ => {}
        }
    }

    let inputs_json: Vec<serde_json::Value> = inputs
        .into_iter()
        .map(|(index, mut fields)| {
            fields.insert("index".to_string(), serde_json::Value::from(index));
            serde_json::Value::Object(fields)
        })
        .collect();
    let outputs_json: Vec<serde_json::Value> = outputs
        .into_iter()
        .map(|(index, mut fields)| {
            fields.insert("index".to_string(), serde_json::Value::from(index));
            serde_json::Value::Object(fields)
        })
        .collect();
    let mixer_json: Vec<serde_json::Value> = mixer
        .into_iter()
        .map(|(output, sources)| {
            let sources_json: Vec<serde_json::Value> = sources
                .into_iter()
                .map(|(input, mut fields)| {
                    fields.insert("input".to_string(), serde_json::Value::from(input));
                    serde_json::Value::Object(fields)
                })
                .collect();
            serde_json::json!({"output": output, "sources": sources_json})
        })
        .collect();

    serde_json::json!({
        "device": {
            "name": device.name,
            "id": device.id,
            "version": device.version,
            "flags": device.flags,
            "timestamp": format_timestamp(timestamp_unix_secs),
        },
        "inputs": inputs_json,
        "outputs": outputs_json,
        "mixer": mixer_json,
        "system": system,
    })
}

/// `audio-device_<sanitized-name>_<date-time>.json`.
pub fn snapshot_filename(device_name: &str, timestamp_unix_secs: u64) -> String {
    format!("audio-device_{}_{}.json", sanitize(device_name), format_timestamp(timestamp_unix_secs))
}

pub fn unix_seconds_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| RmeError::new(ErrorKind::Resource, "snapshot::unix_seconds_now", e.to_string()))
}

fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

fn format_timestamp(unix_seconds: u64) -> String {
    let days = (unix_seconds / 86_400) as i64;
    let secs_of_day = unix_seconds % 86_400;
    let (year, month, day) = civil_from_days(days);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;
    format!("{year:04}-{month:02}-{day:02}_{hour:02}-{minute:02}-{second:02}")
}

/// Converts a day count since the Unix epoch into a proleptic-Gregorian
/// `(year, month, day)` (Hinnant's `civil_from_days`).
fn civil_from_days(z_in: i64) -> (i64, u32, u32) {
    let z = z_in + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year, m as u32, d as u32)
}

fn args_to_json(args: &[OscType]) -> serde_json::Value {
    if args.len() == 1 {
        osc_arg_to_json(&args[0])
    } else {
        serde_json::Value::Array(args.iter().map(osc_arg_to_json).collect())
    }
}

fn osc_arg_to_json(arg: &OscType) -> serde_json::Value {
    match arg {
        OscType::Int(i) => serde_json::Value::from(*i),
        OscType::Float(f) => serde_json::Value::from(*f),
        OscType::String(s) => serde_json::Value::from(s.clone()),
        OscType::Bool(b) => serde_json::Value::from(*b),
        other => serde_json::Value::from(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rme_params::{Leaf, ParameterTree, SemanticType};

    #[test]
    fn known_epoch_day_formats_correctly() {
        // 2024-01-02 03:04:05 UTC.
        assert_eq!(format_timestamp(1_704_164_645), "2024-01-02_03-04-05");
    }

    #[test]
    fn unix_epoch_formats_as_1970() {
        assert_eq!(format_timestamp(0), "1970-01-01_00-00-00");
    }

    #[test]
    fn name_is_sanitized_for_filesystem_safety() {
        let filename = snapshot_filename("My Device/Name!", 0);
        assert_eq!(filename, "audio-device_My_Device_Name__1970-01-01_00-00-00.json");
    }

    #[test]
    fn input_and_system_paths_bucket_into_the_schema() {
        let mut mirror = DeviceMirror::new(ParameterTree::new(vec![
            Leaf::new("/input/1/gain", 0x008, SemanticType::Fixed { scale: 0.1, min: -650, max: 60 }),
            Leaf::new("/clock/source", 0x3064, SemanticType::Enum { variants: vec!["Internal".to_string()] }),
        ]));
        mirror.apply_register(0x008, 120);
        mirror.apply_register(0x3064, 0);

        let device = DeviceInfo { name: "Fireface".to_string(), id: "abc".to_string(), version: "1.0".to_string(), flags: vec![] };
        let document = persisted_state(&device, &mirror, 0);

        assert_eq!(document["inputs"][0]["index"], 1);
        assert!((document["inputs"][0]["gain"].as_f64().unwrap() - 12.0).abs() < 0.01);
        assert_eq!(document["system"]["clock_source"], serde_json::json!([0, "Internal"]));
    }

    #[test]
    fn mix_notifications_bucket_into_the_mixer_schema() {
        let mut mirror = DeviceMirror::new(ParameterTree::new(vec![]));
        let base = rme_params::pair_base_register(1, 1);
        mirror.apply_register(base, -60);
        mirror.apply_register(base + 1, -650);
        mirror.apply_register(base + rme_params::MIX_RIGHT_LEG_OFFSET, -650);
        mirror.apply_register(base + rme_params::MIX_RIGHT_LEG_OFFSET + 1, -60);

        let device = DeviceInfo { name: "Fireface".to_string(), id: "abc".to_string(), version: "1.0".to_string(), flags: vec![] };
        let document = persisted_state(&device, &mirror, 0);

        assert_eq!(document["mixer"][0]["output"], 1);
        assert_eq!(document["mixer"][0]["sources"][0]["input"], 1);
        assert!(document["mixer"][0]["sources"][0]["volume"].as_f64().is_some());
        assert!(document["mixer"][0]["sources"][0]["pan"].as_f64().is_some());
        assert!(document["mixer"][0]["sources"][0]["width"].as_f64().is_some());
    }
}
