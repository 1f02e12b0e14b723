//! Secret objects, owner references and login identities.

pub const CREDENTIALS_KEY: &str = "credentials";
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";

/// Desired outcome of one exchange: assume `role_arn`, publish into `target_secret_name`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationRequest {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub uid: String,
    /// Secret holding `username` and `password` for the IdP
    pub login_secret_name: String,
    pub role_arn: String,
    pub target_secret_name: String,
}

impl FederationRequest {
    pub fn login_secret(&self) -> SecretRef {
        SecretRef {
            namespace: self.namespace.clone(),
            name: self.login_secret_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for SecretRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    /// Values are base64 encoded when serialized
    #[serde(default, with = "base64_data")]
    pub data: std::collections::BTreeMap<String, Vec<u8>>,
}

impl SecretObject {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata,
            data: std::collections::BTreeMap::new(),
        }
    }

    pub fn secret_ref(&self) -> SecretRef {
        SecretRef {
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }
}

impl std::fmt::Debug for SecretObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretObject")
            .field("metadata", &self.metadata)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

mod base64_data {
    use std::collections::BTreeMap;

    pub fn serialize<S>(data: &BTreeMap<String, Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use base64ct::Encoding;
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(data.len()))?;
        for (k, v) in data.iter() {
            map.serialize_entry(k, &base64ct::Base64::encode_string(v))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use base64ct::Encoding;
        use serde::Deserialize;

        BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| {
                base64ct::Base64::decode_vec(&v)
                    .map(|b| (k, b))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// Attaches cascade-delete ownership of `owner` to a derived object.
pub trait OwnerLinker: Send + Sync {
    fn link_owner(
        &self,
        child: &mut ObjectMeta,
        owner: &FederationRequest,
    ) -> Result<(), crate::error::Error>;
}

/// Sets `owner` as the single controlling owner, like a controller-managed object.
#[derive(Debug, Clone, Default)]
pub struct ControllerOwnerLinker;

impl OwnerLinker for ControllerOwnerLinker {
    fn link_owner(
        &self,
        child: &mut ObjectMeta,
        owner: &FederationRequest,
    ) -> Result<(), crate::error::Error> {
        let missing = [
            ("apiVersion", &owner.api_version),
            ("kind", &owner.kind),
            ("name", &owner.name),
            ("uid", &owner.uid),
        ]
        .into_iter()
        .find(|(_, v)| v.is_empty());
        if let Some((field, _)) = missing {
            return Err(crate::error::Error::OwnerLinkFailed(format!(
                "owner {} has no {field}",
                owner.name
            )));
        }

        if owner.namespace != child.namespace {
            return Err(crate::error::Error::OwnerLinkFailed(format!(
                "cross-namespace owner reference is disallowed: owner is in {:?}, object is in {:?}",
                owner.namespace, child.namespace
            )));
        }

        if let Some(existing) = child
            .owner_references
            .iter()
            .find(|r| r.controller == Some(true) && r.uid != owner.uid)
        {
            return Err(crate::error::Error::OwnerLinkFailed(format!(
                "object {} is already controlled by {} {}",
                child.name, existing.kind, existing.name
            )));
        }

        child.owner_references.retain(|r| r.uid != owner.uid);
        child.owner_references.push(OwnerReference {
            api_version: owner.api_version.clone(),
            kind: owner.kind.clone(),
            name: owner.name.clone(),
            uid: owner.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        });
        Ok(())
    }
}

/// Build the derived secret carrying `payload` under `credentials`, owned by `owner`.
pub fn materialize(
    linker: &dyn OwnerLinker,
    payload: Vec<u8>,
    owner: &FederationRequest,
) -> Result<SecretObject, crate::error::Error> {
    let mut secret = SecretObject::new(ObjectMeta {
        name: owner.target_secret_name.clone(),
        namespace: owner.namespace.clone(),
        owner_references: Vec::new(),
    });
    secret.data.insert(CREDENTIALS_KEY.to_string(), payload);
    linker.link_owner(&mut secret.metadata, owner)?;
    Ok(secret)
}

/// Credentials used to authenticate to the IdP
pub struct LoginIdentity {
    pub username: String,
    pub password: secrecy::SecretString,
}

impl std::fmt::Debug for LoginIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginIdentity")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl LoginIdentity {
    /// Both `username` and `password` must be present and non-empty.
    pub fn from_secret(secret: &SecretObject) -> Result<Self, crate::error::Error> {
        let field = |key: &str,
                     missing: &'static str,
                     not_utf8: &'static str|
         -> Result<String, crate::error::Error> {
            let malformed =
                |reason| crate::error::Error::MalformedLoginSecret(secret.secret_ref().to_string(), reason);
            let value = secret.data.get(key).ok_or_else(|| malformed(missing))?;
            let value = std::str::from_utf8(value).map_err(|_| malformed(not_utf8))?;
            if value.is_empty() {
                return Err(malformed(missing));
            }
            Ok(value.to_owned())
        };

        let username = field(
            USERNAME_KEY,
            "username is missing",
            "username is not valid utf-8",
        )?;
        let password = field(
            PASSWORD_KEY,
            "password is missing",
            "password is not valid utf-8",
        )?;
        Ok(Self {
            username,
            password: secrecy::SecretString::new(password),
        })
    }
}
