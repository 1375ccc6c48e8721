/// Defines a typed sled tree: a unit struct naming the tree, with the key
/// and value types it stores.
macro_rules! define_tree {
    ($(#[$docs:meta])+ ( $tree_name:ident ) $key:ty => $value:ty) => {
        $(#[$docs])+
        ///
        #[doc = concat!("Takes [`", stringify!($key), "`] as a key and returns [`", stringify!($value), "`]")]
        #[derive(Clone, Copy, Debug, Default)]
        pub(crate) struct $tree_name;

        impl $crate::sled_store::Schema for $tree_name {
            const TREE_NAME: &'static str = ::core::stringify!($tree_name);
            type Key = $key;
            type Value = $value;
        }
    };
}

pub(crate) use define_tree;
