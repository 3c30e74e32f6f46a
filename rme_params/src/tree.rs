//! [`ParameterTree`]: resolves OSC-style paths to device registers, and
//! codecs values between OSC arguments and 16-bit device words.

use rme_core::{ErrorKind, Result, RmeError};
use rosc::OscType;

use crate::leaf::{Leaf, Segment};

const FLAG_BIT: u16 = 0x8000;
const MAGNITUDE_MASK: u16 = 0x7fff;
const SIGN_BIT: u16 = 0x4000;

fn pack_flagged(flag: bool, value: i16) -> i16 {
    let clamped = (value as i32).clamp(-16384, 16383) as i16;
    let bits = (clamped as u16) & MAGNITUDE_MASK;
    (bits | if flag { FLAG_BIT } else { 0 }) as i16
}

fn unpack_flagged(raw: i16) -> (bool, i16) {
    let bits = raw as u16;
    let flag = bits & FLAG_BIT != 0;
    let low15 = bits & MAGNITUDE_MASK;
    let value = if low15 & SIGN_BIT != 0 { (low15 | FLAG_BIT) as i16 } else { low15 as i16 };
    (flag, value)
}

/// A declarative table of [`Leaf`] bindings for one device model.
#[derive(Debug, Clone, Default)]
pub struct ParameterTree {
    leaves: Vec<Leaf>,
}

impl ParameterTree {
    pub fn new(leaves: Vec<Leaf>) -> Self {
        Self { leaves }
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Walks `path`'s components against every leaf's pattern. Returns the
    /// matching leaf and its resolved register.
    pub fn resolve(&self, path: &str) -> Result<(&Leaf, u16)> {
        let components: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for leaf in &self.leaves {
            if leaf.pattern.len() != components.len() {
                continue;
            }
            let mut index: Option<u16> = None;
            let mut matched = true;
            for (segment, component) in leaf.pattern.iter().zip(&components) {
                match segment {
                    Segment::Literal(expected) => {
                        if expected != component {
                            matched = false;
                            break;
                        }
                    }
                    Segment::Index => match component.parse::<u16>() {
                        Ok(n) => index = Some(n),
                        Err(_) => {
                            matched = false;
                            break;
                        }
                    },
                }
            }
            if matched {
                let register = leaf.register_for_index(index.unwrap_or(0));
                return Ok((leaf, register));
            }
        }
        Err(RmeError::new(ErrorKind::Config, "ParameterTree::resolve", format!("no leaf matches path '{path}'")))
    }

    /// Every `(leaf, index)` whose register equals `register`. Indexed
    /// leaves report the index that produced the match; non-indexed leaves
    /// report index `0`.
    fn leaves_at_register(&self, register: u16) -> Vec<(&Leaf, u16)> {
        self.leaves
            .iter()
            .filter_map(|leaf| {
                if leaf.register_stride == 0 {
                    (leaf.register_base == register).then_some((leaf, 0))
                } else if register >= leaf.register_base {
                    let offset = register - leaf.register_base;
                    (offset % leaf.register_stride == 0).then_some((leaf, offset / leaf.register_stride))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Resolves `path`, validates `args` against its semantic type, and
    /// returns the `(register, raw_value)` to write.
    pub fn encode(&self, path: &str, args: &[OscType]) -> Result<(u16, i16)> {
        let (leaf, register) = self.resolve(path)?;
        let raw = leaf.kind.encode(args)?;
        let wire = if leaf.flagged { pack_flagged(matches!(leaf.kind, crate::semantics::SemanticType::Pan), raw) } else { raw };
        Ok((register, wire))
    }

    /// The outbound codec: a register write may resolve to more than one
    /// leaf (e.g. a pan/volume pair sharing one register disambiguated by
    /// the flag bit), each producing its own `(path, args)` notification.
    pub fn decode(&self, register: u16, raw: i16) -> Vec<(String, Vec<OscType>)> {
        let mut out = Vec::new();
        for (leaf, index) in self.leaves_at_register(register) {
            let value = if leaf.flagged {
                let (flag, magnitude) = unpack_flagged(raw);
                let is_pan = matches!(leaf.kind, crate::semantics::SemanticType::Pan);
                if flag != is_pan {
                    continue;
                }
                magnitude
            } else {
                raw
            };
            out.push((render_path(&leaf.pattern, index), leaf.kind.decode(value)));
        }
        out
    }
}

fn render_path(pattern: &[Segment], index: u16) -> String {
    let mut out = String::new();
    for segment in pattern {
        out.push('/');
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Index => out.push_str(&index.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Leaf;
    use crate::semantics::SemanticType;

    fn sample_tree() -> ParameterTree {
        ParameterTree::new(vec![
            Leaf::indexed("/input/*/gain", 0x100, 4, SemanticType::Fixed { scale: 0.1, min: -650, max: 60 }),
            Leaf::new("/input/1/mute", 0x200, SemanticType::Bool),
            Leaf::new("/input/1/pan", 0x300, SemanticType::Pan).flagged(true),
            Leaf::new("/input/1/volume", 0x300, SemanticType::Level).flagged(true),
        ])
    }

    #[test]
    fn resolve_matches_indexed_components() {
        let tree = sample_tree();
        let (_, register) = tree.resolve("/input/3/gain").unwrap();
        assert_eq!(register, 0x100 + 3 * 4);
    }

    #[test]
    fn resolve_reports_not_found_for_unknown_paths() {
        let tree = sample_tree();
        assert!(tree.resolve("/nonexistent").is_err());
    }

    #[test]
    fn encode_then_decode_roundtrips_a_plain_leaf() {
        let tree = sample_tree();
        let (register, raw) = tree.encode("/input/1/mute", &[OscType::Bool(true)]).unwrap();
        let notifications = tree.decode(register, raw);
        assert_eq!(notifications, vec![("/input/1/mute".to_string(), vec![OscType::Int(1)])]);
    }

    #[test]
    fn shared_register_decodes_to_the_flag_matching_leaf_only() {
        let tree = sample_tree();
        let (register, raw) = tree.encode("/input/1/pan", &[OscType::Int(42)]).unwrap();
        let notifications = tree.decode(register, raw);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, "/input/1/pan");
    }

    #[test]
    fn pan_and_volume_sharing_a_register_decode_independently() {
        let tree = sample_tree();
        let (pan_register, pan_raw) = tree.encode("/input/1/pan", &[OscType::Int(-50)]).unwrap();
        let (vol_register, vol_raw) = tree.encode("/input/1/volume", &[OscType::Float(-3.0)]).unwrap();
        assert_eq!(pan_register, vol_register);

        let pan_notifications = tree.decode(pan_register, pan_raw);
        assert_eq!(pan_notifications[0].0, "/input/1/pan");

        let vol_notifications = tree.decode(vol_register, vol_raw);
        assert_eq!(vol_notifications[0].0, "/input/1/volume");
    }
}
