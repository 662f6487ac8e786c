//! Text manipulation of CoreDNS `Corefile` configurations.

pub const COREFILE_KEY: &str = "Corefile";

pub const SUPERCLUSTER_DOMAIN: &str = "supercluster.local";

/// Present anywhere in a Corefile once the forwarding block was injected.
pub const LIGHTHOUSE_MARKER: &str = "lighthouse";
/// Present once any block for the supercluster zone was written.
pub const SUPERCLUSTER_MARKER: &str = "supercluster";

pub fn has_lighthouse_marker(corefile: &str) -> bool {
    corefile.contains(LIGHTHOUSE_MARKER)
}

pub fn has_supercluster_zone(corefile: &str) -> bool {
    corefile.contains(SUPERCLUSTER_MARKER)
}

pub fn generate_forward_block(resolver_address: &str) -> String {
    format!("#{LIGHTHOUSE_MARKER}\n{SUPERCLUSTER_DOMAIN} {{\nforward . {resolver_address}\n}}\n")
}

pub fn prepend_forward_block(corefile: &str, resolver_address: &str) -> String {
    generate_forward_block(resolver_address) + corefile
}

/// Corefile served by the lighthouse resolver itself.
pub fn generate_resolver_corefile() -> String {
    format!("{SUPERCLUSTER_DOMAIN}:53 {{\n{LIGHTHOUSE_MARKER}\nerrors\nhealth\nready\n}}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBE_COREFILE: &str = ".:53 {\n    errors\n    kubernetes cluster.local\n    forward . /etc/resolv.conf\n}\n";

    #[test]
    fn forward_block_has_expected_format() {
        assert_eq!(
            generate_forward_block("10.0.0.5"),
            "#lighthouse\nsupercluster.local {\nforward . 10.0.0.5\n}\n"
        );
    }

    #[test]
    fn prepending_preserves_existing_content() {
        let patched = prepend_forward_block(KUBE_COREFILE, "10.0.0.5");

        assert!(patched.starts_with("#lighthouse\n"));
        assert!(patched.ends_with(KUBE_COREFILE));
        assert_eq!(patched.matches("forward . 10.0.0.5").count(), 1);
    }

    #[test]
    fn markers_are_detected() {
        let patched = prepend_forward_block(KUBE_COREFILE, "10.0.0.5");

        assert!(!has_lighthouse_marker(KUBE_COREFILE));
        assert!(!has_supercluster_zone(KUBE_COREFILE));
        assert!(has_lighthouse_marker(&patched));
        assert!(has_supercluster_zone(&patched));
        assert!(has_supercluster_zone("supercluster.local {\n}\n"));
    }

    #[test]
    fn resolver_corefile_listens_on_supercluster_zone() {
        assert_eq!(
            generate_resolver_corefile(),
            "supercluster.local:53 {\nlighthouse\nerrors\nhealth\nready\n}\n"
        );
    }
}
