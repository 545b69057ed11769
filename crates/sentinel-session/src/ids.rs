use rand::RngCore;

/// Opaque session identifier. Not part of any on-chain encoding itself —
/// `sentinel-settlement` derives its own 256-bit keccak digest from this
/// string at settlement time (§4.5).
pub(crate) fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("sess-{}", hex::encode(bytes))
}

/// A 96-bit prefix string, unique per session, per §6: "channelId is an
/// opaque 96-bit prefix string unique per session."
pub(crate) fn generate_channel_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

pub(crate) fn generate_proposal_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("prop-{}", hex::encode(bytes))
}
