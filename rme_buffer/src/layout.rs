//! Channel layout: an ordered list of channel roles with a total count `N`.

/// The role a single channel plays within a [`ChannelLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Left,
    Right,
    Center,
    Lfe,
    SurroundLeft,
    SurroundRight,
    /// A numbered channel with no fixed speaker role (e.g. a raw input strip).
    Other(u16),
}

/// An ordered list of channel roles. Position in the list is the channel
/// index used by [`crate::AudioBuffer::channel_ptr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    roles: Vec<ChannelRole>,
}

impl ChannelLayout {
    /// A single-channel layout.
    pub fn mono() -> Self {
        Self {
            roles: vec![ChannelRole::Left],
        }
    }

    /// A left/right stereo pair.
    pub fn stereo() -> Self {
        Self {
            roles: vec![ChannelRole::Left, ChannelRole::Right],
        }
    }

    /// A layout of `n` unnamed channels, numbered in order.
    pub fn with_channel_count(n: usize) -> Self {
        Self {
            roles: (0..n)
                .map(|i| ChannelRole::Other(i as u16))
                .collect(),
        }
    }

    /// Build a layout from an explicit ordered role list.
    pub fn from_roles(roles: Vec<ChannelRole>) -> Self {
        Self { roles }
    }

    /// Total channel count `N`.
    pub fn channel_count(&self) -> usize {
        self.roles.len()
    }

    pub fn roles(&self) -> &[ChannelRole] {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_has_one_channel() {
        assert_eq!(ChannelLayout::mono().channel_count(), 1);
    }

    #[test]
    fn stereo_has_two_channels_left_then_right() {
        let layout = ChannelLayout::stereo();
        assert_eq!(layout.channel_count(), 2);
        assert_eq!(layout.roles(), &[ChannelRole::Left, ChannelRole::Right]);
    }

    #[test]
    fn with_channel_count_numbers_channels_in_order() {
        let layout = ChannelLayout::with_channel_count(4);
        assert_eq!(layout.channel_count(), 4);
        assert_eq!(layout.roles()[2], ChannelRole::Other(2));
    }
}
