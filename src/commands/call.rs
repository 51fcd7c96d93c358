use kt_cli::{api, ApiGateway, Result};

use super::Context;

/// Call an arbitrary API method with `key=value` parameters and print the result as JSON
pub fn call(ctx: &Context, method: &str, params: &str, pretty: bool) -> Result<()> {
    let params = api::parse_key_values(params);
    let token = ctx.token.as_deref().unwrap_or_default();

    let result = ctx.gateway.call(token, method, params)?.into_value()?;
    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");
    Ok(())
}
