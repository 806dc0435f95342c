//! Per-workspace capability map advertised to clients for feature gating.

use std::collections::BTreeMap;

/// The fixed capability map. Reserved domains are advertised as disabled so
/// clients can hide the corresponding editor surfaces.
pub fn default_capabilities() -> BTreeMap<&'static str, bool> {
    BTreeMap::from([
        ("core.mir.document.update@1.0", true),
        ("core.route.manifest.update@1.0", true),
        ("core.settings.global.update@1.0", true),
        ("core.nodegraph.node.move@1.0", false),
        ("core.nodegraph.edge.connect@1.0", false),
        ("core.animation.timeline.keyframe.add@1.0", false),
        ("core.animation.clip.bind@1.0", false),
    ])
}
