//! `moments like`, `moments comment`, `moments uncomment`: reacting to shared moments.
//!
//! Moments are named by id or by any unambiguous prefix, as shown in `moments feed`.

use anyhow::{Context, Result};
use clap::Args;
use keepsake::MomentLedger;

use crate::context::{local_author, AppContext};
use crate::ui;

#[derive(Args, Debug)]
pub struct LikeArgs {
    /// Moment id or a unique prefix of it
    pub moment: String,

    /// Who is reacting (defaults to the login name)
    #[arg(long, env = "MOMENTS_AUTHOR")]
    pub author: Option<String>,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Moment id or a unique prefix of it
    pub moment: String,

    /// Comment text
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// Who is commenting (defaults to the login name)
    #[arg(long, env = "MOMENTS_AUTHOR")]
    pub author: Option<String>,
}

#[derive(Args, Debug)]
pub struct UncommentArgs {
    /// Moment id or a unique prefix of it
    pub moment: String,

    /// Comment id or a prefix of at least four characters
    pub comment: String,

    /// Who wrote the comment (defaults to the login name)
    #[arg(long, env = "MOMENTS_AUTHOR")]
    pub author: Option<String>,
}

fn save(ledger: &MomentLedger) -> Result<()> {
    ledger
        .save()
        .with_context(|| format!("Failed to save {}", ledger.path().display()))
}

pub fn like(ctx: &AppContext, args: LikeArgs) -> Result<()> {
    let author = local_author(args.author.as_deref());
    let ledger = ctx.open_ledger()?;
    let id = ledger.resolve(&args.moment)?;

    let liked = ledger.toggle_like(&id, &author)?;
    save(&ledger)?;

    let count = ledger.get(&id).map(|m| m.likes_count()).unwrap_or_default();
    if liked {
        ui::success(format!("Liked ({})", ui::plural(count, "like")));
    } else {
        ui::success(format!("Like removed ({})", ui::plural(count, "like")));
    }
    Ok(())
}

pub fn comment(ctx: &AppContext, args: CommentArgs) -> Result<()> {
    let author = local_author(args.author.as_deref());
    let ledger = ctx.open_ledger()?;
    let id = ledger.resolve(&args.moment)?;

    let comment = ledger.add_comment(&id, &author, &args.text.join(" "))?;
    save(&ledger)?;

    ui::success(format!("Comment added ({})", ui::short_id(&comment.id)));
    Ok(())
}

pub fn uncomment(ctx: &AppContext, args: UncommentArgs) -> Result<()> {
    let author = local_author(args.author.as_deref());
    let ledger = ctx.open_ledger()?;
    let id = ledger.resolve(&args.moment)?;

    let removed = ledger.delete_comment(&id, &args.comment, &author)?;
    save(&ledger)?;

    ui::success(format!("Comment deleted ({})", ui::short_id(&removed.id)));
    Ok(())
}
