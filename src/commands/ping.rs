use kt_cli::Result;

use super::Context;

/// Check whether the API answers
pub fn ping(ctx: &Context) -> Result<()> {
    if ctx.gateway.ping() {
        println!("API is alive");
    } else {
        println!("API is not alive");
    }
    Ok(())
}
