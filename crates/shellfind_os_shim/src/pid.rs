use std::{
    fmt,
    str,
};

use cfg_if::cfg_if;
use serde::{
    Deserialize,
    Serialize,
};

macro_rules! pid_decl {
    ($typ:ty) => {
        /// Wrapper around the platform's actual process id type.
        #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct Pid(pub(crate) $typ);

        impl From<$typ> for Pid {
            fn from(v: $typ) -> Self {
                Self(v)
            }
        }
        impl From<Pid> for $typ {
            fn from(v: Pid) -> Self {
                v.0
            }
        }
        impl str::FromStr for Pid {
            type Err = <$typ as str::FromStr>::Err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(<$typ>::from_str(s)?))
            }
        }
        impl fmt::Display for Pid {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

cfg_if! {
    if #[cfg(unix)] {
        use nix::libc::pid_t;

        pid_decl!(pid_t);

        impl Pid {
            pub fn as_u32(&self) -> u32 {
                self.0 as _
            }

            pub fn from_u32(pid: u32) -> Option<Self> {
                pid_t::try_from(pid).ok().map(Self)
            }
        }

        impl From<nix::unistd::Pid> for Pid {
            fn from(pid: nix::unistd::Pid) -> Self {
                Pid(pid.as_raw())
            }
        }
    } else if #[cfg(windows)] {
        pid_decl!(u32);

        impl Pid {
            pub fn as_u32(&self) -> u32 {
                self.0
            }

            pub fn from_u32(pid: u32) -> Option<Self> {
                Some(Self(pid))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_pid_parse_and_display() {
        let pid = Pid::from_str("4242").unwrap();
        assert_eq!(pid.as_u32(), 4242);
        assert_eq!(pid.to_string(), "4242");
        assert!(Pid::from_str("init").is_err());
        assert!(Pid::from_str("").is_err());
    }

    #[test]
    fn test_pid_from_u32() {
        assert_eq!(Pid::from_u32(1).unwrap().as_u32(), 1);
    }
}
