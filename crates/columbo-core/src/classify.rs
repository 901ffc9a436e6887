//! Mismatch classification between claimed and actual endpoint identity.

/// Outcome of comparing a URL's claimed identity with the connection that served it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub ip_mismatch: bool,
    pub fqdn_mismatch: bool,
}

/// Plain inequality on both axes. Names are expected to be normalized already by the
/// endpoint resolver; nothing is rewritten here.
pub fn classify(claimed_ip: &str, actual_ip: &str, claimed_fqdn: &str, actual_fqdn: &str) -> Verdict {
    Verdict {
        ip_mismatch: claimed_ip != actual_ip,
        fqdn_mismatch: claimed_fqdn != actual_fqdn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_identity_has_no_mismatch() {
        let v = classify("93.184.216.34", "93.184.216.34", "example.com", "example.com");
        assert_eq!(
            v,
            Verdict {
                ip_mismatch: false,
                fqdn_mismatch: false
            }
        );
    }

    #[test]
    fn cdn_edge_mismatches_both() {
        let v = classify("1.2.3.4", "5.6.7.8", "cdn.example.net", "edge01.cdnprovider.net");
        assert!(v.ip_mismatch);
        assert!(v.fqdn_mismatch);
    }

    #[test]
    fn matches_plain_inequality() {
        let ips = ["10.0.0.1", "10.0.0.2", "::1"];
        let names = ["a.example", "b.example", "10.0.0.1"];
        for ci in ips {
            for ai in ips {
                for cf in names {
                    for af in names {
                        let v = classify(ci, ai, cf, af);
                        assert_eq!(v.ip_mismatch, ci != ai);
                        assert_eq!(v.fqdn_mismatch, cf != af);
                    }
                }
            }
        }
    }

    #[test]
    fn no_case_folding_at_this_layer() {
        assert!(classify("1.1.1.1", "1.1.1.1", "Example.com", "example.com").fqdn_mismatch);
    }
}
