/// Declares a path-parameter struct and its [`PathParams`](crate::registry::PathParams) impl.
///
/// Field names are the placeholder names; field types pick the
/// [`ParamKind`](crate::registry::ParamKind) through
/// [`ParamValue`](crate::registry::ParamValue).
///
/// ```
/// todokit_api::path_params! {
///     /// `{project}/{ticket}`
///     pub struct TicketPath { project: String, ticket: u32 }
/// }
///
/// use todokit_api::registry::PathParams;
/// let path = TicketPath { project: "core".into(), ticket: 7 };
/// assert_eq!(path.value("ticket").as_deref(), Some("7"));
/// assert_eq!(TicketPath::SPEC.len(), 2);
/// ```
#[macro_export]
macro_rules! path_params {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis struct $name {
            $( $(#[$fmeta])* pub $field: $ty ),+
        }

        impl $crate::registry::PathParams for $name {
            const SPEC: &'static [$crate::registry::PathParamSpec] = &[
                $( $crate::registry::PathParamSpec {
                    name: stringify!($field),
                    kind: <$ty as $crate::registry::ParamValue>::KIND,
                } ),+
            ];

            fn value(&self, name: &str) -> ::core::option::Option<::std::string::String> {
                $(
                    if name == stringify!($field) {
                        return ::core::option::Option::Some(
                            $crate::registry::ParamValue::render(&self.$field),
                        );
                    }
                )+
                ::core::option::Option::None
            }
        }
    };
}

/// Declares an endpoint as a zero-sized type implementing
/// [`Endpoint`](crate::registry::Endpoint).
///
/// `params`, `request` and `encoding` are optional. Leaving out `request`
/// makes the endpoint body-less: it gets [`NoBody`](crate::registry::NoBody)
/// as request type and no [`HasRequest`](crate::registry::HasRequest) impl.
/// A path template whose placeholders disagree with `params` fails to compile.
///
/// ```
/// use todokit_api::registry::{Endpoint, Method};
///
/// todokit_api::path_params! { pub struct NoteId { note_id: i64 } }
///
/// todokit_api::endpoint! {
///     pub struct NoteGet => "noteGet" {
///         method: Get,
///         path: "/notes/{note_id}",
///         params: NoteId,
///         response: serde_json::Value,
///     }
/// }
///
/// assert_eq!(NoteGet::DESCRIPTOR.method, Method::Get);
/// assert!(!NoteGet::DESCRIPTOR.has_request());
/// ```
///
/// Dropping `params` from the declaration above leaves `{note_id}`
/// unresolved, and the const assertion rejects it:
///
/// ```compile_fail,E0080
/// todokit_api::endpoint! {
///     pub struct NoteGet => "noteGet" {
///         method: Get,
///         path: "/notes/{note_id}",
///         response: serde_json::Value,
///     }
/// }
/// ```
#[macro_export]
macro_rules! endpoint {
    (
        $(#[$meta:meta])*
        $vis:vis struct $ty:ident => $name:literal {
            method: $method:ident,
            path: $path:literal,
            $( params: $params:ty, )?
            $( request: $req:ty, )?
            response: $resp:ty
            $( , encoding: $enc:ident )?
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $ty;

        impl $crate::registry::Endpoint for $ty {
            type PathParams = $crate::__endpoint_type!($($params)?; $crate::registry::NoParams);
            type Request = $crate::__endpoint_type!($($req)?; $crate::registry::NoBody);
            type Response = $resp;

            const DESCRIPTOR: $crate::registry::EndpointDescriptor =
                $crate::registry::EndpointDescriptor {
                    name: $name,
                    method: $crate::registry::Method::$method,
                    path: $path,
                    path_params: <<Self as $crate::registry::Endpoint>::PathParams
                        as $crate::registry::PathParams>::SPEC,
                    request_type: $crate::__endpoint_request_name!($($req)?),
                    response_type: stringify!($resp),
                    encoding: $crate::__endpoint_encoding!($($enc)?),
                };
        }

        $( $crate::__endpoint_has_request!($ty, $req); )?

        const _: () = ::core::assert!(
            $crate::registry::placeholders_match(
                $path,
                <$ty as $crate::registry::Endpoint>::DESCRIPTOR.path_params,
            ),
            concat!("path placeholders of `", $name, "` do not match its path parameters"),
        );
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __endpoint_type {
    (; $default:ty) => { $default };
    ($given:ty; $default:ty) => { $given };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __endpoint_request_name {
    () => { ::core::option::Option::None };
    ($req:ty) => { ::core::option::Option::Some(stringify!($req)) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __endpoint_encoding {
    () => { $crate::registry::BodyEncoding::Json };
    ($enc:ident) => { $crate::registry::BodyEncoding::$enc };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __endpoint_has_request {
    ($ty:ident, $req:ty) => {
        impl $crate::registry::HasRequest for $ty {}
    };
}

/// Merges resource sub-registries into one name space.
///
/// Emits a `pub use` per sub-module (two endpoints with the same type name
/// collide as a duplicate import), the `EndpointName` enum with descriptor
/// lookup, and a compile-time check that wire names are unique.
macro_rules! compose_registry {
    ( $( $module:ident :: { $( $ty:ident ),+ $(,)? } ),+ $(,)? ) => {
        $( pub use $module::{ $( $ty ),+ }; )+

        /// Every registered endpoint, for callers that pick one at runtime
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EndpointName {
            $( $( $ty ),+ ),+
        }

        const DESCRIPTORS: &[EndpointDescriptor] = &[
            $( $( <$module::$ty as Endpoint>::DESCRIPTOR ),+ ),+
        ];

        const _: () = ::core::assert!(
            names_unique(DESCRIPTORS),
            "two endpoints share a wire name",
        );

        impl EndpointName {
            pub const ALL: &'static [EndpointName] = &[
                $( $( EndpointName::$ty ),+ ),+
            ];

            #[must_use]
            pub const fn descriptor(self) -> &'static EndpointDescriptor {
                &DESCRIPTORS[self as usize]
            }

            #[must_use]
            pub const fn wire_name(self) -> &'static str {
                self.descriptor().name
            }
        }
    };
}
