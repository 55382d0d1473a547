use std::collections::HashMap;
use std::env::{
    self,
    VarError,
};
use std::ffi::OsStr;
use std::sync::{
    Arc,
    Mutex,
};

use crate::Shim;

/// Read access to the process environment.
#[derive(Debug, Clone, Default)]
pub struct Env(inner::Inner);

mod inner {
    use std::collections::HashMap;
    use std::sync::{
        Arc,
        Mutex,
    };

    #[derive(Debug, Clone, Default)]
    pub(super) enum Inner {
        #[default]
        Real,
        Fake(Arc<Mutex<Fake>>),
    }

    #[derive(Debug, Clone, Default)]
    pub(super) struct Fake {
        pub vars: HashMap<String, String>,
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_fake() -> Self {
        Self(inner::Inner::Fake(Arc::new(Mutex::new(inner::Fake::default()))))
    }

    /// Create a fake process environment from a slice of tuples.
    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        use inner::Inner;
        let vars: HashMap<_, _> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Self(Inner::Fake(Arc::new(Mutex::new(inner::Fake { vars }))))
    }

    pub fn get<K: AsRef<str>>(&self, key: K) -> Result<String, VarError> {
        use inner::Inner;
        match &self.0 {
            Inner::Real => env::var(key.as_ref()),
            Inner::Fake(fake) => fake
                .lock()
                .unwrap()
                .vars
                .get(key.as_ref())
                .cloned()
                .ok_or(VarError::NotPresent),
        }
    }

    /// Sets the environment variable `key` to the value `value` for the currently running
    /// process.
    ///
    /// # Safety
    ///
    /// See [std::env::set_var] for the safety requirements.
    pub unsafe fn set_var(&self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        use inner::Inner;
        match &self.0 {
            Inner::Real => std::env::set_var(key, value),
            Inner::Fake(fake) => {
                fake.lock().unwrap().vars.insert(
                    key.as_ref().to_str().expect("key must be valid str").to_string(),
                    value.as_ref().to_str().expect("value must be valid str").to_string(),
                );
            },
        }
    }
}

impl Shim for Env {
    fn is_real(&self) -> bool {
        matches!(self.0, inner::Inner::Real)
    }
}
