//! Static endpoint registry
//!
//! Every backend operation is a zero-sized type implementing [`Endpoint`].
//! Its associated types fix what a caller may pass and what it gets back, so
//! `ApiClient::execute::<TodoGetOne>` only accepts [`TodoId`] path parameters,
//! refuses any body and returns a [`Todo`].
//!
//! The resource modules (`todo`, `auth`, `user`, `item`) are merged into one
//! name space here. [`EndpointName`] lists them all for runtime lookup by
//! wire name.

#[macro_use]
mod macros;

mod auth;
mod descriptor;
mod item;
mod todo;
mod user;

use crate::error::ConfigurationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use descriptor::{
    BodyEncoding, EndpointDescriptor, Method, ParamKind, PathParamSpec, names_unique,
    placeholders_match, str_eq,
};

pub use auth::{
    ApiKey, SessionUser, SigninForm, SignupForm, UpdatePasswordForm, UpdateProfileForm,
    UserResponse,
};
pub use item::{Item, ItemForm, ItemId, ItemPatch, ItemQuery};
pub use todo::{Todo, TodoForm, TodoId};
pub use user::{UserId, UserListQuery, UserModel, UserRoleUpdateForm, UserSettings, UserStatus};

/// One backend operation
pub trait Endpoint: Send + Sync + 'static {
    /// Values for the placeholders of the path template
    type PathParams: PathParams;
    /// Query (GET/DELETE) or body payload; [`NoBody`] when the operation takes none
    type Request: Serialize + Send + Sync;
    /// Decoded success body.
    ///
    /// A 204 or an empty body decodes from nothing, which only `Option<T>`,
    /// [`NoContent`] and `serde_json::Value` accept. Declare one of those
    /// when the backend may answer without a body; any other type turns
    /// such an answer into an [`ApiError`](crate::ApiError).
    type Response: DeserializeOwned + Send;

    const DESCRIPTOR: EndpointDescriptor;
}

/// Marker for endpoints that accept a payload.
///
/// Only these expose `RequestOptions::body`.
pub trait HasRequest: Endpoint {}

/// Typed values for the placeholders of a path template
pub trait PathParams: Send + Sync {
    const SPEC: &'static [PathParamSpec];

    /// String form of the parameter `name`, before percent-encoding.
    fn value(&self, name: &str) -> Option<String>;
}

/// Path parameter set of templates without placeholders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoParams;

impl PathParams for NoParams {
    const SPEC: &'static [PathParamSpec] = &[];

    fn value(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Request type of endpoints that take no input.
///
/// Uninhabited: no value of it can be built, so no body can be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoBody {}

impl Serialize for NoBody {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        match *self {}
    }
}

/// Response type of endpoints that answer without a body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NoContent;

/// Primitive that may fill a path placeholder
pub trait ParamValue {
    const KIND: ParamKind;

    fn render(&self) -> String;
}

impl ParamValue for String {
    const KIND: ParamKind = ParamKind::String;

    fn render(&self) -> String {
        self.clone()
    }
}

impl ParamValue for bool {
    const KIND: ParamKind = ParamKind::Boolean;

    fn render(&self) -> String {
        self.to_string()
    }
}

macro_rules! number_param {
    ($($ty:ty),+) => {
        $(
            impl ParamValue for $ty {
                const KIND: ParamKind = ParamKind::Number;

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

number_param!(i32, i64, u32, u64);

compose_registry! {
    todo::{TodoGetAll, TodoGetOne, TodoCreate, TodoUpdate, TodoDelete},
    auth::{
        AuthSignin,
        AuthSignup,
        AuthSignout,
        AuthGetApiKey,
        AuthCreateApiKey,
        AuthDeleteApiKey,
        AuthUpdateProfile,
        AuthUpdatePassword,
    },
    user::{UserGetUsers, UserUpdateRole, UserGetById},
    item::{
        ItemList,
        ItemCreate,
        ItemGet,
        ItemReplace,
        ItemPatchMany,
        ItemDelete,
        ItemOptions,
        ItemTrace,
    },
}

impl EndpointName {
    /// Looks an endpoint up by wire name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.wire_name() == name)
    }
}

impl FromStr for EndpointName {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| ConfigurationError::UnknownEndpoint(s.to_owned()))
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn every_template_matches_its_parameters() {
        for name in EndpointName::ALL {
            let d = name.descriptor();
            assert!(d.path.starts_with('/'), "{}", d.name);
            assert!(placeholders_match(d.path, d.path_params), "{}", d.name);
        }
    }

    #[test]
    fn lookup_by_wire_name() {
        assert_eq!(
            "todoGetAll".parse::<EndpointName>().unwrap(),
            EndpointName::TodoGetAll
        );
        assert_eq!(EndpointName::ItemTrace.to_string(), "itemTrace");
        assert_eq!(
            EndpointName::UserGetById.descriptor(),
            &<UserGetById as Endpoint>::DESCRIPTOR
        );
    }

    #[test]
    fn unknown_wire_name_is_configuration_error() {
        let err = "todoGetEverything".parse::<EndpointName>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownEndpoint(ref n) if n == "todoGetEverything"));
    }

    #[test]
    fn descriptors_follow_declaration_order() {
        assert_eq!(EndpointName::ALL.len(), DESCRIPTORS.len());
        for (i, name) in EndpointName::ALL.iter().enumerate() {
            assert_eq!(name.descriptor(), &DESCRIPTORS[i]);
        }
    }

    #[test]
    fn form_endpoints_are_sign_in_and_sign_up() {
        let form: Vec<_> = EndpointName::ALL
            .iter()
            .filter(|e| e.descriptor().encoding == BodyEncoding::Form)
            .map(|e| e.wire_name())
            .collect();
        assert_eq!(form, ["authSignin", "authSignup"]);
    }

    #[test]
    fn body_less_endpoints_have_no_request_type() {
        assert!(!TodoGetAll::DESCRIPTOR.has_request());
        assert!(!ItemOptions::DESCRIPTOR.has_request());
        assert_eq!(TodoCreate::DESCRIPTOR.request_type, Some("TodoForm"));
        assert!(ItemPatchMany::DESCRIPTOR.has_request());
    }

    #[test]
    fn param_kinds() {
        assert_eq!(TodoId::SPEC[0].kind, ParamKind::Number);
        assert_eq!(ItemId::SPEC[0].kind, ParamKind::String);
        assert_eq!(
            TodoId { todo_id: 12 }.value("todo_id").as_deref(),
            Some("12")
        );
        assert_eq!(TodoId { todo_id: 12 }.value("id"), None);
        assert_eq!(true.render(), "true");
    }
}
