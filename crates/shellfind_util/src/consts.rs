pub const CLI_BINARY_NAME: &str = "shellfind";

/// Ancestors inspected before giving up.
pub const DEFAULT_MAX_DEPTH: usize = 6;

pub mod env_var {
    macro_rules! define_env_vars {
        ($($(#[$meta:meta])* $ident:ident = $name:expr),*) => {
            $(
                $(#[$meta])*
                pub const $ident: &str = $name;
            )*

            pub const ALL: &[&str] = &[$($ident),*];
        }
    }

    define_env_vars! {
        /// The user's configured default shell, used as the login shell hint
        SHELL = "SHELL",

        /// The level of logging
        SHELLFIND_LOG_LEVEL = "SHELLFIND_LOG_LEVEL",

        /// Mirror logs to stderr when set
        SHELLFIND_LOG_STDERR = "SHELLFIND_LOG_STDERR",

        /// Overrides the default ancestor depth limit
        SHELLFIND_MAX_DEPTH = "SHELLFIND_MAX_DEPTH",

        /// Selects the process table backend, `ps` or `sys-info`
        SHELLFIND_BACKEND = "SHELLFIND_BACKEND"
    }
}
