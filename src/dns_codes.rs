//! The numeric code fields of the wire format.
//!
//! A forwarder never acts on these values, it relays them. Every field
//! therefore gets the same treatment: named variants for the values worth
//! reading in a debug log, and an `Other` catch-all that carries anything
//! else through unchanged, so unknown codes round-trip bit for bit. One
//! macro stamps out the lot.

macro_rules! wire_code {
    (
        $(#[$meta:meta])*
        $name:ident($int:ty) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $num:literal,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
            /// Any other value, relayed unchanged.
            Other($int),
        }
        impl $name {
            #[must_use]
            pub fn new(value: $int) -> Self {
                match value {
                    $($num => $name::$variant,)*
                    other => $name::Other(other),
                }
            }

            #[must_use]
            pub fn num(&self) -> $int {
                match self {
                    $($name::$variant => $num,)*
                    $name::Other(other) => *other,
                }
            }
        }
    };
}

wire_code! {
    /// Header opcode, 4 bits: the kind of query, set by the originator and
    /// copied into the response.
    ///
    /// <https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1>
    DnsOpCode(u8) {
        Query = 0,
        InverseQuery = 1,
        Status = 2,
    }
}

wire_code! {
    /// Header response code, 4 bits: how the responding server fared.
    ///
    /// <https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1>
    DnsResponseCode(u8) {
        NoError = 0,
        FormatError = 1,
        ServerFailure = 2,
        NameError = 3,
        NotImplemented = 4,
        Refused = 5,
    }
}

wire_code! {
    /// Record and question type, 16 bits.
    ///
    /// <https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.2> and
    /// <https://datatracker.ietf.org/doc/html/rfc3596#section-2> (AAAA).
    DnsType(u16) {
        /// IPv4 address
        A = 1,
        /// Authoritative name server
        NS = 2,
        /// The canonical name for an alias
        CNAME = 5,
        /// Marks the start of a zone of authority
        SOA = 6,
        /// Domain name pointer
        PTR = 12,
        /// Mail exchange
        MX = 15,
        /// Text string
        TXT = 16,
        /// IPv6 address
        AAAA = 28,
    }
}

wire_code! {
    /// Record and question class, 16 bits. Internet is the only one seen in
    /// practice.
    ///
    /// <https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.4>
    DnsClass(u16) {
        Internet = 1,
        Chaos = 3,
        Hesiod = 4,
        Any = 255,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(DnsOpCode::Query, DnsOpCode::new(0));
        assert_eq!(2, DnsOpCode::Status.num());
        assert_eq!(DnsResponseCode::NameError, DnsResponseCode::new(3));
        assert_eq!(5, DnsResponseCode::Refused.num());
        assert_eq!(DnsType::AAAA, DnsType::new(28));
        assert_eq!(16, DnsType::TXT.num());
        assert_eq!(DnsClass::Any, DnsClass::new(255));
        assert_eq!(1, DnsClass::Internet.num());
    }

    #[test]
    fn test_unknown_values_round_trip() {
        for value in [3_u8, 7, 15] {
            assert_eq!(value, DnsOpCode::new(value).num());
        }
        for value in [6_u8, 11, 15] {
            assert_eq!(value, DnsResponseCode::new(value).num());
        }
        for value in [0_u16, 64, 257, u16::MAX] {
            assert_eq!(value, DnsType::new(value).num());
            assert_eq!(value, DnsClass::new(value).num());
        }
        assert_eq!(DnsType::Other(64), DnsType::new(64));
        assert_eq!(DnsClass::Other(2), DnsClass::new(2));
    }
}
