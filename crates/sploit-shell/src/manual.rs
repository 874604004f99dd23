//! Built-in user manual shown by `rtfm`.

pub const MANUAL: &str = r#"
SPLOIT(1)                       User Manual                      SPLOIT(1)

NAME
    sploit - interactive shell driving a PHP backdoor over HTTP

SYNOPSIS
    sploit [CONFIG_FILE]

DESCRIPTION
    sploit keeps a session made of settings, a link derived from them
    and a remote environment. Commands are typed one per line; several
    commands may share a line when separated by ';'. Words follow shell
    quoting rules: single quotes are literal, double quotes allow '\"'
    and '\\', a backslash outside quotes escapes the next character.

    The configuration file (first argument, $SPLOIT_CONFIG or
    <config dir>/sploit/config.toml) may preset settings, lock some of
    them, and name a plugin manifest.

GETTING STARTED
    1. Run 'infect' and plant the printed payload in a PHP page of the
       target web server.
    2. Point the TARGET setting at that page:
           set TARGET http://example.com/index.php
    3. Run 'exploit'. Once the backdoor answers, a remote shell opens
       and its prompt shows the target host.

SETTINGS
    TARGET          URL of the page carrying the backdoor
    BACKDOOR        payload template, %%PASSKEY%% marks the header name
    PASSKEY         HTTP header carrying the code to evaluate
    REQ_TIMEOUT     seconds to wait for the target
    REQ_USER_AGENT  User-Agent sent with every request
    SAVEPATH        directory for saved sessions
    SAVEFILE        file the session was last saved to
    TEXTEDITOR      editor used by commands that open files

    An invalid value is rejected and the previous one kept. Changing
    TARGET from a remote shell first checks the new target; the change
    is dropped if the backdoor does not answer.

PROMPT
    On a terminal, Tab completes command names and the names taken by
    'set' and 'env'. Up and Down walk the history, Ctrl-C drops the
    line and Ctrl-D on an empty line ends input.

SCRIPTING
    'eval' runs files or literal strings as if typed at the prompt:
        eval audit.sploit "set REQ_TIMEOUT 30"

EXIT
    'exit' leaves a remote shell back to the main shell, and leaves
    sploit from the main shell. End of input leaves sploit.
    'sploit --resume FILE' starts again from a session written by 'save'.
"#;
