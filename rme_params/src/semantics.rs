//! The semantic value types a [`crate::Leaf`] may hold, and their
//! OSC-argument <-> 16-bit device-value codecs.

use rme_core::{ErrorKind, Result, RmeError};
use rosc::OscType;

/// Sentinel raw value for a [`SemanticType::Level`] at or below -65 dB.
pub const LEVEL_NEGATIVE_INFINITY: i16 = -650;

#[derive(Debug, Clone)]
pub enum SemanticType {
    Int { min: i32, max: i32 },
    Fixed { scale: f64, min: i32, max: i32 },
    Enum { variants: Vec<String> },
    Bool,
    /// Logarithmic dB, tenths-of-a-dB device value; <= -65 dB saturates to
    /// [`LEVEL_NEGATIVE_INFINITY`].
    Level,
    /// Signed percent in `[-100, 100]`.
    Pan,
}

fn first_arg<'a>(args: &'a [OscType], context: &str) -> Result<&'a OscType> {
    args.first().ok_or_else(|| RmeError::new(ErrorKind::Config, context, "expected at least one OSC argument"))
}

fn numeric_arg(arg: &OscType, context: &str) -> Result<f64> {
    match arg {
        OscType::Int(i) => Ok(*i as f64),
        OscType::Float(f) => Ok(*f as f64),
        OscType::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(RmeError::new(ErrorKind::Config, context, "expected a numeric OSC argument")),
    }
}

impl SemanticType {
    /// Validates and converts OSC arguments into a signed 16-bit device
    /// value.
    pub fn encode(&self, args: &[OscType]) -> Result<i16> {
        match self {
            SemanticType::Int { min, max } => {
                let v = numeric_arg(first_arg(args, "SemanticType::encode")?, "Int")? as i32;
                Ok(v.clamp(*min, *max) as i16)
            }
            SemanticType::Fixed { scale, min, max } => {
                let v = numeric_arg(first_arg(args, "SemanticType::encode")?, "Fixed")?;
                let device = (v / scale).round() as i32;
                Ok(device.clamp(*min, *max) as i16)
            }
            SemanticType::Enum { variants } => {
                let arg = first_arg(args, "SemanticType::encode")?;
                let index = match arg {
                    OscType::Int(i) => *i,
                    OscType::String(name) => variants
                        .iter()
                        .position(|v| v.eq_ignore_ascii_case(name))
                        .ok_or_else(|| RmeError::new(ErrorKind::Config, "Enum", format!("unknown variant '{name}'")))?
                        as i32,
                    _ => return Err(RmeError::new(ErrorKind::Config, "Enum", "expected an int index or a name")),
                };
                if index < 0 || index as usize >= variants.len() {
                    return Err(RmeError::new(ErrorKind::Range, "Enum", "variant index out of range"));
                }
                Ok(index as i16)
            }
            SemanticType::Bool => {
                let v = numeric_arg(first_arg(args, "SemanticType::encode")?, "Bool")?;
                Ok(if v != 0.0 { 1 } else { 0 })
            }
            SemanticType::Level => {
                let db = numeric_arg(first_arg(args, "SemanticType::encode")?, "Level")?;
                if db <= -65.0 {
                    Ok(LEVEL_NEGATIVE_INFINITY)
                } else {
                    Ok((db * 10.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16)
                }
            }
            SemanticType::Pan => {
                let v = numeric_arg(first_arg(args, "SemanticType::encode")?, "Pan")?;
                Ok(v.clamp(-100.0, 100.0).round() as i16)
            }
        }
    }

    /// Converts a signed 16-bit device value into outbound OSC arguments.
    /// `Enum` emits both the name and the index (`,is`).
    pub fn decode(&self, raw: i16) -> Vec<OscType> {
        match self {
            SemanticType::Int { .. } => vec![OscType::Int(raw as i32)],
            SemanticType::Fixed { scale, .. } => vec![OscType::Float((raw as f64 * scale) as f32)],
            SemanticType::Enum { variants } => {
                let index = raw as usize;
                let name = variants.get(index).cloned().unwrap_or_default();
                vec![OscType::Int(raw as i32), OscType::String(name)]
            }
            SemanticType::Bool => vec![OscType::Int(if raw != 0 { 1 } else { 0 })],
            SemanticType::Level => {
                if raw == LEVEL_NEGATIVE_INFINITY {
                    vec![OscType::Float(f32::NEG_INFINITY)]
                } else {
                    vec![OscType::Float(raw as f32 / 10.0)]
                }
            }
            SemanticType::Pan => vec![OscType::Int(raw as i32)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_clamps_to_its_range() {
        let kind = SemanticType::Int { min: 0, max: 10 };
        assert_eq!(kind.encode(&[OscType::Int(99)]).unwrap(), 10);
        assert_eq!(kind.encode(&[OscType::Int(-5)]).unwrap(), 0);
    }

    #[test]
    fn fixed_roundtrips_within_scale_resolution() {
        let kind = SemanticType::Fixed { scale: 0.1, min: -100, max: 100 };
        let raw = kind.encode(&[OscType::Float(3.2)]).unwrap();
        let decoded = kind.decode(raw);
        match decoded.as_slice() {
            [OscType::Float(f)] => assert!((f - 3.2).abs() < 0.05),
            _ => panic!("unexpected decode shape"),
        }
    }

    #[test]
    fn enum_accepts_case_insensitive_name_and_emits_both_forms() {
        let kind = SemanticType::Enum { variants: vec!["Line".to_string(), "Mic".to_string()] };
        let raw = kind.encode(&[OscType::String("mic".to_string())]).unwrap();
        assert_eq!(raw, 1);
        assert_eq!(kind.decode(raw), vec![OscType::Int(1), OscType::String("Mic".to_string())]);
    }

    #[test]
    fn enum_rejects_unknown_variant() {
        let kind = SemanticType::Enum { variants: vec!["Line".to_string()] };
        assert!(kind.encode(&[OscType::String("nope".to_string())]).is_err());
    }

    #[test]
    fn bool_accepts_true_false_osc_types() {
        let kind = SemanticType::Bool;
        assert_eq!(kind.encode(&[OscType::Bool(true)]).unwrap(), 1);
        assert_eq!(kind.encode(&[OscType::Bool(false)]).unwrap(), 0);
    }

    #[test]
    fn level_saturates_to_negative_infinity_sentinel() {
        let kind = SemanticType::Level;
        assert_eq!(kind.encode(&[OscType::Float(-70.0)]).unwrap(), LEVEL_NEGATIVE_INFINITY);
        assert_eq!(kind.decode(LEVEL_NEGATIVE_INFINITY), vec![OscType::Float(f32::NEG_INFINITY)]);
    }

    #[test]
    fn level_roundtrips_above_the_floor() {
        let kind = SemanticType::Level;
        let raw = kind.encode(&[OscType::Float(-12.3)]).unwrap();
        match kind.decode(raw).as_slice() {
            [OscType::Float(f)] => assert!((f - (-12.3)).abs() < 0.05),
            _ => panic!("unexpected decode shape"),
        }
    }

    #[test]
    fn pan_clamps_to_signed_percent_range() {
        let kind = SemanticType::Pan;
        assert_eq!(kind.encode(&[OscType::Int(500)]).unwrap(), 100);
        assert_eq!(kind.encode(&[OscType::Int(-500)]).unwrap(), -100);
    }
}
