use std::str::FromStr;

use super::error::TypeError;

/// Raw query-string pairs in arrival order; repeated keys are kept.
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.first(key).map(str::to_string)
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.first(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for {key}"))),
            None => Ok(None),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, TypeError> {
        match self.first(key) {
            Some("1") | Some("true") => Ok(true),
            Some("0") | Some("false") | None => Ok(false),
            Some(_) => Err(TypeError::new(&format!("Invalid boolean for {key}"))),
        }
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }
}
