//! Outbound radio frame.
//!
//! One frame is `ROW` bytes, byte `i` being the column bitmask of row `i`. There is no header, sequence
//! number or checksum, and a frame is never a delta: the link is lossy, so each frame alone must be
//! enough for the receiver to restore the complete key state.

use crate::matrix::KeySnapshot;

/// Frame pushed to the radio, a verbatim copy of a [`KeySnapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WirelessPayload<const ROW: usize> {
    bytes: [u8; ROW],
}

impl<const ROW: usize> Default for WirelessPayload<ROW> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROW: usize> WirelessPayload<ROW> {
    /// Length of a frame on air
    pub const LEN: usize = ROW;

    /// All-released frame
    pub const fn new() -> Self {
        Self { bytes: [0; ROW] }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite the frame with the content of `snapshot`
    pub fn fill_from(&mut self, snapshot: &KeySnapshot<ROW>) {
        self.bytes.copy_from_slice(snapshot.rows());
    }
}

impl<const ROW: usize> From<&KeySnapshot<ROW>> for WirelessPayload<ROW> {
    fn from(snapshot: &KeySnapshot<ROW>) -> Self {
        assemble(snapshot)
    }
}

/// Copy `snapshot` into a frame, row by row, without any transformation.
pub fn assemble<const ROW: usize>(snapshot: &KeySnapshot<ROW>) -> WirelessPayload<ROW> {
    let mut payload = WirelessPayload::new();
    payload.fill_from(snapshot);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_copies_rows_in_order() {
        let snapshot = KeySnapshot::from_rows([0b1000_0000, 0b0100_0010, 0, 0b1111_1110, 0b0000_0010]);
        let payload = assemble(&snapshot);
        assert_eq!(
            payload.as_bytes(),
            &[0b1000_0000, 0b0100_0010, 0, 0b1111_1110, 0b0000_0010]
        );
        assert_eq!(WirelessPayload::<5>::LEN, 5);
    }

    #[test]
    fn fill_from_overwrites_previous_frame() {
        let mut payload = assemble(&KeySnapshot::from_rows([0xFE; 5]));
        payload.fill_from(&KeySnapshot::new());
        assert_eq!(payload, WirelessPayload::new());
    }
}
