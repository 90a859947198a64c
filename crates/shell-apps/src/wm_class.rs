//! WM_CLASS canonicalization for descriptor matching.

/// Rewrites for applications whose WM_CLASS never matched their descriptor
/// name, applied after case folding and space mapping.
const WM_CLASS_REWRITES: &[(&str, &str)] = &[("gimp-2.8", "gimp")];

/// Canonicalize a WM_CLASS value for descriptor-file matching: lowercase,
/// spaces mapped to hyphens, plus a fixed table of special-case rewrites.
///
/// Pure function; the registry appends the `.desktop` suffix itself.
#[must_use]
pub fn canonicalize_wm_class(wm_class: &str) -> String {
    // Handles classes like "Fedora Eclipse".
    let canonical = wm_class.to_ascii_lowercase().replace(' ', "-");

    for (from, to) in WM_CLASS_REWRITES {
        if canonical == *from {
            return (*to).to_string();
        }
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_maps_spaces() {
        assert_eq!(canonicalize_wm_class("Fedora Eclipse"), "fedora-eclipse");
    }

    #[test]
    fn rewrites_known_malformed_classes() {
        assert_eq!(canonicalize_wm_class("GIMP-2.8"), "gimp");
    }

    #[test]
    fn leaves_well_formed_classes_alone() {
        assert_eq!(canonicalize_wm_class("org.example.Editor"), "org.example.editor");
        assert_eq!(canonicalize_wm_class("xterm"), "xterm");
    }
}
