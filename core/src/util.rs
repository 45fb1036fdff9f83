use lazy_static::lazy_static;
use ron::extensions::Extensions;

lazy_static! {
    /// RON options shared by every config file: `Option` fields may be written bare.
    pub static ref RON: ron::Options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
}
