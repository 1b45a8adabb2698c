//! Output script classification and address rendering.

use bitcoin::{Address, Network, Script};

/// Renders the address for an output script, or the empty string when the
/// script is not one of the shapes we track.
///
/// Accepted shapes: P2TR, P2WPKH, P2WSH, P2PKH, P2SH. The network picks the
/// bech32 human-readable part and the legacy version bytes. This never fails:
/// exotic or malformed scripts are simply unowned.
pub fn render_address(script: &Script, network: Network) -> String {
    let recognized = script.is_p2tr()
        || script.is_p2wpkh()
        || script.is_p2wsh()
        || script.is_p2pkh()
        || script.is_p2sh();
    if !recognized {
        return String::new();
    }
    Address::from_script(script, network)
        .map(|address| address.to_string())
        .unwrap_or_default()
}
