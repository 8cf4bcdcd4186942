use std::cell::RefCell;

use string_interner::{symbol::SymbolU32, DefaultBackend, DefaultHashBuilder};

/// Default string interner
pub type StringInterner<B = DefaultBackend<Name>, H = DefaultHashBuilder> =
    string_interner::StringInterner<Name, B, H>;

/// Interned message name, the key type of every interface table
pub type Name = SymbolU32;

/// Room for the base vocabulary and a handful of user words
const INITIAL_NAMES: usize = 256;

thread_local! {
    static INTERN: RefCell<StringInterner> =
        RefCell::new(StringInterner::with_capacity(INITIAL_NAMES));
}

/// Intern a string if it has not been allocated by the global interner,
/// otherwise, returning the existing reference for that string.
pub fn id<S: AsRef<str>>(s: S) -> Name {
    INTERN.with(|intern| intern.borrow_mut().get_or_intern(s))
}

/// Get the string reference from the global interner using its id.
pub fn str(id: Name) -> String {
    INTERN.with(|intern| {
        intern
            .borrow()
            .resolve(id)
            .expect("Preallocated")
            .to_string()
    })
}

/// Look at the string of an id without copying it. `f` must not intern.
pub fn with_str<R, F: FnOnce(&str) -> R>(id: Name, f: F) -> R {
    INTERN.with(|intern| f(intern.borrow().resolve(id).expect("Preallocated")))
}
