use std::mem::size_of;

/// Byte offset of a node within the arena that backs a tree.
pub type DataIndex = u32;

/// Marker trait to emit warnings when using get_helper on the Value type
/// rather than on RBNode<Value>
pub trait Get: bytemuck::Pod {}

/// Read a struct of type T in an array of data at a given index.
pub fn get_helper<T: Get>(data: &[u8], index: DataIndex) -> &T {
    let index_usize: usize = index as usize;
    bytemuck::from_bytes(&data[index_usize..index_usize + size_of::<T>()])
}

/// Read a struct of type T in an array of data at a given index.
pub fn get_mut_helper<T: Get>(data: &mut [u8], index: DataIndex) -> &mut T {
    let index_usize: usize = index as usize;
    bytemuck::from_bytes_mut(&mut data[index_usize..index_usize + size_of::<T>()])
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "trace")]
        {
            ::log::trace!("[{}:{}] {}", std::file!(), std::line!(), std::format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Pair {
        a: u32,
        b: u32,
    }
    impl Get for Pair {}

    #[test]
    fn test_get_helpers() {
        let mut data: [u64; 4] = [0; 4];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut data);

        *get_mut_helper::<Pair>(bytes, 8) = Pair { a: 7, b: 9 };
        assert_eq!(*get_helper::<Pair>(bytes, 8), Pair { a: 7, b: 9 });
        assert_eq!(*get_helper::<Pair>(bytes, 0), Pair { a: 0, b: 0 });
    }
}
