/// Declares a copyable id newtype used to key one of the arenas owned by
/// [`Display`](crate::Display).
///
/// Ids are handed out by the display and stay unique for its whole
/// lifetime; a lookup with the id of a destroyed object simply yields
/// "not found".
macro_rules! id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

pub(crate) use id_type;
