//! # DNS Type Numbers
//!
//! Resource-record type codes, response-code mnemonics, and the DNSSEC
//! algorithm and digest registries the interpreter classifies against.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The NetBIOS name service port. Lookups against it relax the label-length
/// rules and carry NBSTAT records under the SRV type code.
pub const NETBIOS_NS_PORT: u16 = 137;

// ---------------------------------------------------------------------------
// Resource-record types
// ---------------------------------------------------------------------------

/// Resource-record type codes the interpreter dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RrType {
    A,
    Ns,
    Cname,
    Soa,
    Wks,
    Ptr,
    Hinfo,
    Mx,
    Txt,
    Nbs,
    Srv,
    A6,
    Aaaa,
    Edns,
    Ds,
    Rrsig,
    Nsec,
    Dnskey,
    Nsec3,
    Spf,
    Tsig,
    Caa,
    Unknown(u16),
}

impl RrType {
    /// Map a wire type code to its variant.
    pub fn from_u16(code: u16) -> Self {
        match code {
            1 => RrType::A,
            2 => RrType::Ns,
            5 => RrType::Cname,
            6 => RrType::Soa,
            11 => RrType::Wks,
            12 => RrType::Ptr,
            13 => RrType::Hinfo,
            15 => RrType::Mx,
            16 => RrType::Txt,
            28 => RrType::Aaaa,
            32 => RrType::Nbs,
            33 => RrType::Srv,
            38 => RrType::A6,
            41 => RrType::Edns,
            43 => RrType::Ds,
            46 => RrType::Rrsig,
            47 => RrType::Nsec,
            48 => RrType::Dnskey,
            50 => RrType::Nsec3,
            99 => RrType::Spf,
            250 => RrType::Tsig,
            257 => RrType::Caa,
            other => RrType::Unknown(other),
        }
    }

    /// The wire type code.
    pub fn as_u16(&self) -> u16 {
        match self {
            RrType::A => 1,
            RrType::Ns => 2,
            RrType::Cname => 5,
            RrType::Soa => 6,
            RrType::Wks => 11,
            RrType::Ptr => 12,
            RrType::Hinfo => 13,
            RrType::Mx => 15,
            RrType::Txt => 16,
            RrType::Aaaa => 28,
            RrType::Nbs => 32,
            RrType::Srv => 33,
            RrType::A6 => 38,
            RrType::Edns => 41,
            RrType::Ds => 43,
            RrType::Rrsig => 46,
            RrType::Nsec => 47,
            RrType::Dnskey => 48,
            RrType::Nsec3 => 50,
            RrType::Spf => 99,
            RrType::Tsig => 250,
            RrType::Caa => 257,
            RrType::Unknown(other) => *other,
        }
    }

    /// The mnemonic name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            RrType::A => "A",
            RrType::Ns => "NS",
            RrType::Cname => "CNAME",
            RrType::Soa => "SOA",
            RrType::Wks => "WKS",
            RrType::Ptr => "PTR",
            RrType::Hinfo => "HINFO",
            RrType::Mx => "MX",
            RrType::Txt => "TXT",
            RrType::Aaaa => "AAAA",
            RrType::Nbs => "NBS",
            RrType::Srv => "SRV",
            RrType::A6 => "A6",
            RrType::Edns => "OPT",
            RrType::Ds => "DS",
            RrType::Rrsig => "RRSIG",
            RrType::Nsec => "NSEC",
            RrType::Dnskey => "DNSKEY",
            RrType::Nsec3 => "NSEC3",
            RrType::Spf => "SPF",
            RrType::Tsig => "TSIG",
            RrType::Caa => "CAA",
            RrType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for RrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Map a DNS response code to its mnemonic name.
pub fn rcode_name(rcode: u8) -> &'static str {
    match rcode {
        0 => "NOERROR",
        1 => "FORMERR",
        2 => "SERVFAIL",
        3 => "NXDOMAIN",
        4 => "NOTIMP",
        5 => "REFUSED",
        6 => "YXDOMAIN",
        7 => "YXRRSET",
        8 => "NXRRSET",
        9 => "NOTAUTH",
        10 => "NOTZONE",
        _ => "UNKNOWN",
    }
}

// ---------------------------------------------------------------------------
// DNSSEC registries
// ---------------------------------------------------------------------------

/// Zone-signing algorithm numbers carried by RRSIG and DNSKEY records.
///
/// Values 9 and 11 are unassigned; anything outside the registry maps to
/// `Unknown` and is reported as an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnssecAlgo {
    RsaMd5,
    DiffieHellman,
    DsaSha1,
    EllipticCurve,
    RsaSha1,
    DsaNsec3Sha1,
    RsaSha1Nsec3Sha1,
    RsaSha256,
    RsaSha512,
    Gost,
    EcdsaP256Sha256,
    EcdsaP384Sha384,
    Indirect,
    PrivateDns,
    PrivateOid,
    Unknown(u8),
}

impl DnssecAlgo {
    /// Map an algorithm number to its registry entry.
    pub fn from_u8(algo: u8) -> Self {
        match algo {
            1 => DnssecAlgo::RsaMd5,
            2 => DnssecAlgo::DiffieHellman,
            3 => DnssecAlgo::DsaSha1,
            4 => DnssecAlgo::EllipticCurve,
            5 => DnssecAlgo::RsaSha1,
            6 => DnssecAlgo::DsaNsec3Sha1,
            7 => DnssecAlgo::RsaSha1Nsec3Sha1,
            8 => DnssecAlgo::RsaSha256,
            10 => DnssecAlgo::RsaSha512,
            12 => DnssecAlgo::Gost,
            13 => DnssecAlgo::EcdsaP256Sha256,
            14 => DnssecAlgo::EcdsaP384Sha384,
            252 => DnssecAlgo::Indirect,
            253 => DnssecAlgo::PrivateDns,
            254 => DnssecAlgo::PrivateOid,
            other => DnssecAlgo::Unknown(other),
        }
    }
}

/// Digest type numbers carried by DS records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnssecDigest {
    Reserved,
    Sha1,
    Sha256,
    Gost,
    Sha384,
    Unknown(u8),
}

impl DnssecDigest {
    /// Map a digest type number to its registry entry.
    pub fn from_u8(digest: u8) -> Self {
        match digest {
            0 => DnssecDigest::Reserved,
            1 => DnssecDigest::Sha1,
            2 => DnssecDigest::Sha256,
            3 => DnssecDigest::Gost,
            4 => DnssecDigest::Sha384,
            other => DnssecDigest::Unknown(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rr_type_round_trip() {
        for code in [1u16, 2, 5, 6, 11, 12, 13, 15, 16, 28, 32, 33, 38, 41, 43, 46, 47, 48, 50, 99, 250, 257] {
            assert_eq!(RrType::from_u16(code).as_u16(), code);
        }
        assert_eq!(RrType::from_u16(4242), RrType::Unknown(4242));
        assert_eq!(RrType::Unknown(4242).as_u16(), 4242);
    }

    #[test]
    fn test_rr_type_names() {
        assert_eq!(RrType::A.name(), "A");
        assert_eq!(RrType::Aaaa.name(), "AAAA");
        assert_eq!(RrType::Edns.name(), "OPT");
        assert_eq!(RrType::Unknown(9999).name(), "UNKNOWN");
    }

    #[test]
    fn test_rcode_names() {
        assert_eq!(rcode_name(0), "NOERROR");
        assert_eq!(rcode_name(3), "NXDOMAIN");
        assert_eq!(rcode_name(15), "UNKNOWN");
    }

    #[test]
    fn test_dnssec_algo_registry() {
        assert_eq!(DnssecAlgo::from_u8(1), DnssecAlgo::RsaMd5);
        assert_eq!(DnssecAlgo::from_u8(8), DnssecAlgo::RsaSha256);
        assert_eq!(DnssecAlgo::from_u8(14), DnssecAlgo::EcdsaP384Sha384);
        assert_eq!(DnssecAlgo::from_u8(253), DnssecAlgo::PrivateDns);
        // 9 and 11 are unassigned.
        assert_eq!(DnssecAlgo::from_u8(9), DnssecAlgo::Unknown(9));
        assert_eq!(DnssecAlgo::from_u8(11), DnssecAlgo::Unknown(11));
    }

    #[test]
    fn test_dnssec_digest_registry() {
        assert_eq!(DnssecDigest::from_u8(0), DnssecDigest::Reserved);
        assert_eq!(DnssecDigest::from_u8(2), DnssecDigest::Sha256);
        assert_eq!(DnssecDigest::from_u8(4), DnssecDigest::Sha384);
        assert_eq!(DnssecDigest::from_u8(77), DnssecDigest::Unknown(77));
    }
}
