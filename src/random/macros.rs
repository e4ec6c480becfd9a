/// Use this to define a unique type which will be used as a key to retrieve
/// an independent rng stream from [`RandomStreams`](crate::random::RandomStreams).
///
/// ```
/// use rabies_model::define_rng;
/// use rabies_model::random::RandomStreams;
///
/// define_rng!(LitterRng);
///
/// let mut streams = RandomStreams::new(42);
/// let litter = streams.int_value(LitterRng, 2, 6);
/// assert!((2..=6).contains(&litter));
/// ```
#[macro_export]
macro_rules! define_rng {
    ($vis:vis $random_id:ident) => {
        #[derive(Copy, Clone, Debug)]
        $vis struct $random_id;

        impl $crate::random::RngId for $random_id {
            type RngType = $crate::rand::rngs::SmallRng;

            fn get_name() -> &'static str {
                stringify!($random_id)
            }
        }

        // This ensures that you can't define two RngIds with the same name
        $crate::paste::paste! {
            #[doc(hidden)]
            #[no_mangle]
            #[allow(non_upper_case_globals)]
            pub static [<rng_name_duplication_guard_ $random_id>]: () = ();
        }
    };
}
pub use define_rng;
