use crate::{
    error::ResolveResult,
    node::LavalinkResolver,
};

/// Connection settings of a Lavalink/Andesite node used for track resolution.
pub struct NodeBuilder {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) ssl: bool,
    pub(crate) pass: String,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2333,
            ssl: false,
            pass: "youshallnotpass".to_string(),
        }
    }
}

impl NodeBuilder {
    pub fn set_host(&mut self, host: impl ToString) -> &mut Self {
        self.host = host.to_string();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn set_password(&mut self, password: impl ToString) -> &mut Self {
        self.pass = password.to_string();
        self
    }

    pub fn set_ssl(&mut self, ssl: bool) -> &mut Self {
        self.ssl = ssl;
        self
    }

    pub(crate) fn rest_url(&self) -> String {
        if self.ssl {
            format!("https://{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    pub fn build(self) -> ResolveResult<LavalinkResolver> {
        LavalinkResolver::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_url_follows_ssl_flag() {
        let mut builder = NodeBuilder::default();
        assert_eq!(builder.rest_url(), "http://localhost:2333");

        builder.set_host("lava.example").set_port(443).set_ssl(true);
        assert_eq!(builder.rest_url(), "https://lava.example:443");
    }
}
