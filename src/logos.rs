pub const DEFAULT_LOGO: &str = "/logos/default.png";

const KNOWN_LOGOS: &[(&str, &str)] = &[
    ("carrefour", "/logos/carrefour.png"),
    ("auchan", "/logos/auchan.png"),
    ("leclerc", "/logos/leclerc.png"),
    ("monoprix", "/logos/monoprix.png"),
    ("franprix", "/logos/franprix.png"),
    ("lidl", "/logos/lidl.png"),
    ("aldi", "/logos/aldi.png"),
    ("casino", "/logos/casino.png"),
    ("intermarché", "/logos/intermarche.png"),
    ("picard", "/logos/picard.png"),
    ("décathlon", "/logos/decathlon.png"),
    ("fnac", "/logos/fnac.png"),
    ("darty", "/logos/darty.png"),
    ("boulanger", "/logos/boulanger.png"),
    ("la poste", "/logos/la-poste.png"),
    ("sncf", "/logos/sncf.png"),
    ("total", "/logos/total.png"),
    ("shell", "/logos/shell.png"),
    ("bp", "/logos/bp.png"),
];

/// Logo path for a shop name; case-insensitive exact match on the trimmed name.
pub fn logo_for(shop_name: &str) -> &'static str {
    let wanted = shop_name.trim().to_lowercase();
    KNOWN_LOGOS
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, path)| *path)
        .unwrap_or(DEFAULT_LOGO)
}
