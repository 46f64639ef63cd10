//! Startup banner and command cheat sheet: plain literal strings, no
//! box-drawing art.

pub fn print_welcome() {
    println!();
    println!("DFS client -- distributed network file system");
    println!();
}

pub fn print_command_help() {
    println!("Available commands:");
    println!("  VIEW [-a] [-l] [-al]");
    println!("  READ <file>            CREATE <file>          DELETE <file>");
    println!("  WRITE <file> <n>       INFO <file>            STREAM <file>");
    println!("  EXEC <file>            UNDO <file>");
    println!("  CHECKPOINT <file> <tag>        VIEWCHECKPOINT <file> <tag>");
    println!("  REVERT <file> <tag>            LISTCHECKPOINTS <file>");
    println!("  ADDACCESS -R|-W <file> <user>  REMACCESS <file> <user>");
    println!("  LIST                   EXIT | QUIT");
    println!();
}
