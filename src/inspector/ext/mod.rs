//! Optional [`Inspector`](super::Inspector) extensions.
//!
//! Each extension is a trait with `Inspector` as its supertrait, plus a
//! `*Ops` type alias for the `&mut dyn` handle returned from the matching
//! `Inspector::support_*` method. Hosts enable an extension like so:
//!
//! ```ignore
//! impl Inspector for MyHost {
//!     // ...
//!     fn support_assign(&mut self) -> Option<AssignValueOps<'_, Self>> {
//!         Some(self)
//!     }
//! }
//! ```

macro_rules! define_ext {
    ($extname:ident, $exttrait:ident) => {
        #[doc = concat!("See [`", stringify!($exttrait), "`].")]
        pub type $extname<'a, I> =
            &'a mut dyn $exttrait<Error = <I as crate::inspector::Inspector>::Error>;
    };
}

pub mod assign;
pub mod symbols;
