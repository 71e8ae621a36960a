use std::str::FromStr;

use super::error::{Error, TypeError};

pub type FormData = Vec<(String, String)>;

/// Query string parameters. Keys may repeat (`?tags=lunch&tags=dinner`).
#[derive(Debug, Default, Clone)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) if value.is_empty() => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for '{key}'")).into()),
            None => Ok(None),
        }
    }

    /// `1`/`true` and `0`/`false`; absent means `false`.
    pub fn get_flag(&self, key: &str) -> Result<bool, Error> {
        match self.get_str(key).as_deref() {
            None | Some("") | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(_) => Err(TypeError::new(&format!("Invalid flag for '{key}'")).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_keys() {
        let f = form(&[("tags", "breakfast"), ("page", "2"), ("tags", "lunch")]);
        assert_eq!(f.get_all("tags"), vec!["breakfast", "lunch"]);
        assert_eq!(f.get_number::<i64>("page").unwrap(), Some(2));
        assert_eq!(f.get_number::<i64>("limit").unwrap(), None);
    }

    #[test]
    fn bad_number_is_rejected() {
        let f = form(&[("page", "two")]);
        assert!(f.get_number::<i64>("page").is_err());
    }

    #[test]
    fn flags() {
        let f = form(&[("is_favorited", "1"), ("is_in_shopping_cart", "0")]);
        assert!(f.get_flag("is_favorited").unwrap());
        assert!(!f.get_flag("is_in_shopping_cart").unwrap());
        assert!(!f.get_flag("missing").unwrap());
        assert!(form(&[("is_favorited", "yes")])
            .get_flag("is_favorited")
            .is_err());
    }
}
