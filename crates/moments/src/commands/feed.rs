//! `moments feed`: recently shared moments, newest first.

use anyhow::Result;
use clap::Args;
use keepsake::DEFAULT_FEED_SIZE;

use crate::context::AppContext;
use crate::ui;

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// How many moments to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_FEED_SIZE)]
    pub limit: usize,

    /// Print the moments as JSON
    #[arg(long)]
    pub json: bool,

    /// List the comments under each moment
    #[arg(long)]
    pub comments: bool,
}

pub fn run(ctx: &AppContext, args: FeedArgs) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let moments = ledger.recent(args.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&moments)?);
        return Ok(());
    }

    if moments.is_empty() {
        println!("No moments yet. Share one with `moments capture`.");
        return Ok(());
    }

    for moment in &moments {
        println!("{}", ui::format_moment(moment));
        if args.comments {
            for comment in moment.recent_comments() {
                println!("{}", ui::format_comment(comment));
            }
        }
        println!();
    }
    Ok(())
}
