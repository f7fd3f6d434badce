/// A callable with a fixed invocation signature.
///
/// `Args` is the tuple of parameter types, so `Fn(f32, f32) -> f32` is a
/// `Callable<(f32, f32), Output = f32>`. The trait is implemented for every
/// closure, function item and function pointer of up to twelve parameters,
/// which lets the graph store them without knowing their concrete types.
///
/// Closure parameters can't be inferred through this trait, so closures passed
/// to the graph need annotated parameter types.
pub trait Callable<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($($A:ident),*) => {
        #[allow(non_snake_case)]
        impl<F, R, $($A),*> Callable<($($A,)*)> for F
        where
            F: Fn($($A),*) -> R,
        {
            type Output = R;

            #[inline]
            fn invoke(&self, args: ($($A,)*)) -> R {
                let ($($A,)*) = args;
                (self)($($A),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A);
impl_callable!(A, B);
impl_callable!(A, B, C);
impl_callable!(A, B, C, D);
impl_callable!(A, B, C, D, E);
impl_callable!(A, B, C, D, E, G);
impl_callable!(A, B, C, D, E, G, H);
impl_callable!(A, B, C, D, E, G, H, I);
impl_callable!(A, B, C, D, E, G, H, I, J);
impl_callable!(A, B, C, D, E, G, H, I, J, K);
impl_callable!(A, B, C, D, E, G, H, I, J, K, L);
impl_callable!(A, B, C, D, E, G, H, I, J, K, L, M);
