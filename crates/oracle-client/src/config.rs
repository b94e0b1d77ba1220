//! Connection parameters and connect-string parsing

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};
use crate::util::to_upper;

/// Default Oracle listener port
fn default_port() -> u16 {
    1521
}

/// Default host when none is given
fn default_host() -> String {
    "localhost".to_string()
}

/// Default driver prefetch size
fn default_fetch_size() -> u32 {
    10_000
}

/// Connection and attach options for one Oracle database.
///
/// At most one of `service_name`, `sid` and `tns_alias` should be set;
/// when none is set the effective connect descriptor uses host and port
/// only and will fail at open time.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Database host
    #[serde(default = "default_host")]
    pub host: String,

    /// Listener port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Service name for EasyConnect descriptors
    #[serde(default)]
    pub service_name: String,

    /// Legacy SID, used when no service name is given
    #[serde(default)]
    pub sid: String,

    /// TNS alias; takes precedence over host/port/service
    #[serde(default)]
    pub tns_alias: String,

    /// Database user
    #[serde(default)]
    pub user: String,

    /// Database password
    #[serde(default)]
    pub password: String,

    /// Oracle wallet directory for wallet-based authentication
    #[serde(default)]
    pub wallet_location: String,

    /// Default schema; falls back to the user name when empty
    #[serde(default)]
    pub schema: String,

    /// Attached read-only; the DML path refuses to run when set
    #[serde(default)]
    pub read_only: bool,

    /// Driver prefetch size for scans
    #[serde(default = "default_fetch_size")]
    pub fetch_size: u32,
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: String::new(),
            sid: String::new(),
            tns_alias: String::new(),
            user: String::new(),
            password: String::new(),
            wallet_location: String::new(),
            schema: String::new(),
            read_only: false,
            fetch_size: default_fetch_size(),
        }
    }
}

// Manual Debug so the password never lands in logs.
impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("sid", &self.sid)
            .field("tns_alias", &self.tns_alias)
            .field("user", &self.user)
            .field("schema", &self.schema)
            .field("read_only", &self.read_only)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

impl ConnectionParameters {
    /// Parse a connection string.
    ///
    /// Two forms are accepted: the key-value form
    /// `host=H port=P service=S user=U password=W [schema=X] ...` and
    /// EasyConnect `//host[:port][/service] [key=val ...]`. Unknown keys
    /// are ignored.
    pub fn parse(conn_str: &str) -> Result<Self> {
        if conn_str.starts_with("//") {
            return Self::parse_easy_connect(conn_str);
        }

        let kv = parse_key_value_string(conn_str);
        let get = |key: &str| kv.get(key).cloned().unwrap_or_default();

        let mut params = Self {
            host: kv.get("host").cloned().unwrap_or_else(default_host),
            ..Self::default()
        };

        if let Some(port) = kv.get("port") {
            params.port = port.parse().map_err(|_| {
                OracleError::InvalidParameters(format!("invalid port: {port}"))
            })?;
        }

        params.service_name = if kv.contains_key("service") {
            get("service")
        } else {
            get("service_name")
        };
        params.sid = get("sid");
        params.tns_alias = get("tns");
        params.user = if kv.contains_key("user") {
            get("user")
        } else {
            get("username")
        };
        params.password = get("password");
        params.schema = get("schema");
        params.wallet_location = if kv.contains_key("wallet") {
            get("wallet")
        } else {
            get("wallet_location")
        };

        if let Some(fetch) = kv.get("fetch_size") {
            params.fetch_size = fetch.parse().map_err(|_| {
                OracleError::InvalidParameters(format!("invalid fetch_size: {fetch}"))
            })?;
        }

        Ok(params)
    }

    /// Parse the EasyConnect form `//host[:port][/service] [key=val ...]`.
    fn parse_easy_connect(conn_str: &str) -> Result<Self> {
        let mut params = Self::default();

        let (ec_part, kv_part) = match conn_str.find(' ') {
            Some(pos) => (&conn_str[..pos], &conn_str[pos + 1..]),
            None => (conn_str, ""),
        };

        let ec = &ec_part[2..];
        let colon = ec.find(':');
        let slash = ec.find('/');

        match (colon, slash) {
            (Some(c), s) if s.map_or(true, |s| c < s) => {
                params.host = ec[..c].to_string();
                let rest = &ec[c + 1..];
                match rest.find('/') {
                    Some(s2) => {
                        params.port = rest[..s2].parse().map_err(|_| {
                            OracleError::InvalidParameters(format!(
                                "invalid port in EasyConnect string: {ec_part}"
                            ))
                        })?;
                        params.service_name = rest[s2 + 1..].to_string();
                    }
                    None => {
                        params.port = rest.parse().map_err(|_| {
                            OracleError::InvalidParameters(format!(
                                "invalid port in EasyConnect string: {ec_part}"
                            ))
                        })?;
                    }
                }
            }
            (_, Some(s)) => {
                params.host = ec[..s].to_string();
                params.service_name = ec[s + 1..].to_string();
            }
            _ => {
                params.host = ec.to_string();
            }
        }

        if params.host.is_empty() {
            params.host = default_host();
        }

        if !kv_part.is_empty() {
            let kv = parse_key_value_string(kv_part);
            let get = |key: &str| kv.get(key).cloned().unwrap_or_default();
            params.user = if kv.contains_key("user") {
                get("user")
            } else {
                get("username")
            };
            params.password = get("password");
            params.schema = get("schema");
            if let Some(fetch) = kv.get("fetch_size") {
                params.fetch_size = fetch.parse().map_err(|_| {
                    OracleError::InvalidParameters(format!("invalid fetch_size: {fetch}"))
                })?;
            }
        }

        Ok(params)
    }

    /// Apply attach-time option overrides on top of a parsed connection
    /// string. `schema` replaces the default schema and `fetch_size` the
    /// prefetch size; unknown keys are ignored.
    pub fn apply_options(&mut self, options: &HashMap<String, String>) -> Result<()> {
        if let Some(schema) = options.get("schema") {
            self.schema = schema.clone();
        }
        if let Some(fetch) = options.get("fetch_size") {
            self.fetch_size = fetch.parse().map_err(|_| {
                OracleError::InvalidParameters(format!("invalid fetch_size: {fetch}"))
            })?;
        }
        Ok(())
    }

    /// Validate parameter combinations before opening connections.
    pub fn validate(&self) -> Result<()> {
        let descriptors = [&self.service_name, &self.sid, &self.tns_alias]
            .iter()
            .filter(|s| !s.is_empty())
            .count();
        if descriptors > 1 {
            return Err(OracleError::InvalidParameters(
                "at most one of service, sid and tns may be set".to_string(),
            ));
        }
        if self.fetch_size == 0 {
            return Err(OracleError::InvalidParameters(
                "fetch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the connect descriptor handed to the driver.
    ///
    /// A TNS alias wins outright; otherwise the EasyConnect form is used,
    /// falling back to a full descriptor when only a SID is available.
    pub fn build_connect_string(&self) -> String {
        if !self.tns_alias.is_empty() {
            return self.tns_alias.clone();
        }
        if self.service_name.is_empty() && !self.sid.is_empty() {
            return format!(
                "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA=(SID={})))",
                self.host, self.port, self.sid
            );
        }
        let mut descriptor = format!("//{}:{}/", self.host, self.port);
        descriptor.push_str(&self.service_name);
        descriptor
    }

    /// The schema used for lookups when none is named: the configured
    /// schema, falling back to the user, upper-cased either way.
    pub fn effective_schema(&self) -> String {
        if !self.schema.is_empty() {
            to_upper(&self.schema)
        } else {
            to_upper(&self.user)
        }
    }
}

/// Tokenize a `key=value key='quoted value'` string.
///
/// Keys without a value are skipped; single quotes group a value with
/// embedded whitespace.
pub fn parse_key_value_string(s: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    while pos < len {
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= len {
            break;
        }

        let key_start = pos;
        while pos < len && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let key = &s[key_start..pos];
        if key.is_empty() {
            pos += 1;
            continue;
        }

        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= len || bytes[pos] != b'=' {
            continue;
        }
        pos += 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = if pos < len && bytes[pos] == b'\'' {
            pos += 1;
            let val_start = pos;
            while pos < len && bytes[pos] != b'\'' {
                pos += 1;
            }
            let value = &s[val_start..pos];
            if pos < len {
                pos += 1;
            }
            value
        } else {
            let val_start = pos;
            while pos < len && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            &s[val_start..pos]
        };

        result.insert(key.to_string(), value.to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = ConnectionParameters::default();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 1521);
        assert_eq!(params.fetch_size, 10_000);
        assert!(!params.read_only);
    }

    #[test]
    fn test_parse_key_value_form() {
        let params = ConnectionParameters::parse(
            "host=db.example.com port=1522 service=ORCLPDB user=scott password=tiger schema=hr",
        )
        .unwrap();
        assert_eq!(params.host, "db.example.com");
        assert_eq!(params.port, 1522);
        assert_eq!(params.service_name, "ORCLPDB");
        assert_eq!(params.user, "scott");
        assert_eq!(params.password, "tiger");
        assert_eq!(params.schema, "hr");
    }

    #[test]
    fn test_parse_defaults_and_unknown_keys() {
        let params =
            ConnectionParameters::parse("user=scott password=tiger nonsense=42").unwrap();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 1521);
        assert_eq!(params.fetch_size, 10_000);
    }

    #[test]
    fn test_parse_quoted_value() {
        let params = ConnectionParameters::parse("user=scott password='t i g e r'").unwrap();
        assert_eq!(params.password, "t i g e r");
    }

    #[test]
    fn test_parse_easy_connect() {
        let params =
            ConnectionParameters::parse("//db.example.com:1522/ORCLPDB user=scott").unwrap();
        assert_eq!(params.host, "db.example.com");
        assert_eq!(params.port, 1522);
        assert_eq!(params.service_name, "ORCLPDB");
        assert_eq!(params.user, "scott");
    }

    #[test]
    fn test_parse_easy_connect_without_port() {
        let params = ConnectionParameters::parse("//db.example.com/ORCLPDB").unwrap();
        assert_eq!(params.host, "db.example.com");
        assert_eq!(params.port, 1521);
        assert_eq!(params.service_name, "ORCLPDB");
    }

    #[test]
    fn test_parse_invalid_port() {
        assert!(matches!(
            ConnectionParameters::parse("host=x port=nope"),
            Err(OracleError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_build_connect_string_precedence() {
        let mut params = ConnectionParameters {
            service_name: "ORCLPDB".to_string(),
            ..Default::default()
        };
        assert_eq!(params.build_connect_string(), "//localhost:1521/ORCLPDB");

        params.tns_alias = "PRODDB".to_string();
        assert_eq!(params.build_connect_string(), "PRODDB");

        params.tns_alias.clear();
        params.service_name.clear();
        params.sid = "ORCL".to_string();
        assert!(params.build_connect_string().contains("(SID=ORCL)"));
    }

    #[test]
    fn test_reparse_built_string_is_consistent() {
        let params = ConnectionParameters {
            host: "db.example.com".to_string(),
            port: 1522,
            service_name: "ORCLPDB".to_string(),
            ..Default::default()
        };
        let reparsed = ConnectionParameters::parse(&params.build_connect_string()).unwrap();
        assert_eq!(reparsed.host, params.host);
        assert_eq!(reparsed.port, params.port);
        assert_eq!(reparsed.service_name, params.service_name);
    }

    #[test]
    fn test_effective_schema_falls_back_to_user() {
        let mut params = ConnectionParameters {
            user: "scott".to_string(),
            ..Default::default()
        };
        assert_eq!(params.effective_schema(), "SCOTT");

        params.schema = "hr".to_string();
        assert_eq!(params.effective_schema(), "HR");
        // Upper-casing is idempotent.
        params.schema = params.effective_schema();
        assert_eq!(params.effective_schema(), "HR");
    }

    #[test]
    fn test_apply_options_overrides() {
        let mut params =
            ConnectionParameters::parse("host=x service=S user=scott schema=hr").unwrap();
        let options = HashMap::from([
            ("schema".to_string(), "sales".to_string()),
            ("fetch_size".to_string(), "500".to_string()),
            ("unknown".to_string(), "ignored".to_string()),
        ]);
        params.apply_options(&options).unwrap();
        assert_eq!(params.effective_schema(), "SALES");
        assert_eq!(params.fetch_size, 500);

        let bad = HashMap::from([("fetch_size".to_string(), "lots".to_string())]);
        assert!(params.apply_options(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_conflicting_descriptors() {
        let params = ConnectionParameters {
            service_name: "A".to_string(),
            sid: "B".to_string(),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = ConnectionParameters {
            fetch_size: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        // No descriptor at all is allowed; the open fails later instead.
        assert!(ConnectionParameters::default().validate().is_ok());
    }

    #[test]
    fn test_debug_hides_password() {
        let params = ConnectionParameters {
            password: "tiger".to_string(),
            ..Default::default()
        };
        assert!(!format!("{params:?}").contains("tiger"));
    }
}
